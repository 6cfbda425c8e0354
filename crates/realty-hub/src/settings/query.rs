use std::collections::HashMap;

use url::{form_urlencoded, Url};

use super::keys::SettingKey;

/// Query-string parameters of the page (or deployment URL) being served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: HashMap<String, String>,
}

impl QueryParams {
    /// Parses a raw query string, with or without the leading `?`.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut values = HashMap::new();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            // First occurrence wins, matching URLSearchParams::get.
            values
                .entry(name.into_owned())
                .or_insert_with(|| value.into_owned());
        }
        Self { values }
    }

    pub fn from_url(raw: &str) -> Result<Self, url::ParseError> {
        let url = Url::parse(raw)?;
        Ok(Self::parse(url.query().unwrap_or_default()))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Non-empty parameter for `key`, looked up by its external name.
    pub fn setting(&self, key: SettingKey) -> Option<&str> {
        self.get(key.query_param())
    }

    /// Every setting carried by these parameters.
    pub fn settings(&self) -> Vec<(SettingKey, &str)> {
        SettingKey::all()
            .into_iter()
            .filter_map(|key| self.setting(key).map(|value| (key, value)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_deployment_url() {
        let params = QueryParams::from_url(
            "https://homes.example.com/?tenantId=acme&airtableApiKey=pat%2Fkey&agentName=Dana+Reyes",
        )
        .expect("valid url");

        assert_eq!(params.setting(SettingKey::TenantId), Some("acme"));
        assert_eq!(params.setting(SettingKey::AirtableApiKey), Some("pat/key"));
        assert_eq!(params.setting(SettingKey::AgentName), Some("Dana Reyes"));
    }

    #[test]
    fn blank_values_count_as_absent() {
        let params = QueryParams::parse("?mlsApiKey=&agentBio=%20%20");
        assert_eq!(params.setting(SettingKey::MlsApiKey), None);
        assert_eq!(params.setting(SettingKey::AgentBio), None);
        assert!(params.settings().is_empty());
    }

    #[test]
    fn padded_values_are_kept_verbatim() {
        let params = QueryParams::parse("agentName=%20Dana%20&agentBio=Line+one");
        assert_eq!(params.setting(SettingKey::AgentName), Some(" Dana "));
        assert_eq!(params.setting(SettingKey::AgentBio), Some("Line one"));
    }

    #[test]
    fn first_value_wins_for_repeated_names() {
        let params = QueryParams::parse("agentFilter=Dana&agentFilter=Sam");
        assert_eq!(params.setting(SettingKey::AgentFilter), Some("Dana"));
    }
}
