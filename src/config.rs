use std::{collections::HashMap, fmt, fs::File, io::BufReader, path::Path};

use anyhow::{ensure, Context};
use serde::Deserialize;
use url::Url;

const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";
const DEFAULT_WP_GRAPHQL_URL: &str = "https://api.warrior.well-played.gg/graphql";

#[derive(Deserialize)]
pub struct RosterConfig {
    /// Discord bot token, generated from the Discord Developer Portal
    pub discord_token: String,
    /// ID of the Discord guild whose members are managed
    pub discord_guild_id: String,
    /// Base URL of the Discord REST API, including the version segment
    #[serde(default = "default_discord_api_url")]
    pub discord_api_url: Url,
    /// Secret shared with WellPlayed, used to verify webhook signatures
    pub wp_webhook_secret: String,
    /// WellPlayed App ID, can be found on the WellPlayed console
    pub wp_app_id: String,
    /// WellPlayed App secret, can be found on the WellPlayed console
    pub wp_app_secret: String,
    /// ID of the Discord identity provider configured on WellPlayed
    pub wp_identity_provider_id: String,
    /// WellPlayed GraphQL endpoint
    #[serde(default = "default_wp_graphql_url")]
    pub wp_graphql_url: Url,
    /// Static headers sent with every GraphQL request (authorization, organization id...)
    #[serde(default)]
    pub wp_graphql_headers: HashMap<String, String>,
    /// Custom player field written for every member of a synchronized team. Nothing is written
    /// when absent.
    #[serde(default)]
    pub custom_field: Option<CustomFieldMapping>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomFieldMapping {
    pub property: String,
    pub value: String,
}

fn default_discord_api_url() -> Url {
    Url::parse(DEFAULT_DISCORD_API_URL).expect("default Discord API URL is valid")
}

fn default_wp_graphql_url() -> Url {
    Url::parse(DEFAULT_WP_GRAPHQL_URL).expect("default WellPlayed GraphQL URL is valid")
}

impl RosterConfig {
    /// Reads and validates the YAML configuration file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config_file =
            File::open(path).with_context(|| format!("couldn't open {}:", path.display()))?;
        let config: RosterConfig = serde_yaml::from_reader(BufReader::new(config_file))
            .context("couldn't parse config file")?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("discord_token", &self.discord_token),
            ("discord_guild_id", &self.discord_guild_id),
            ("wp_webhook_secret", &self.wp_webhook_secret),
            ("wp_app_id", &self.wp_app_id),
            ("wp_app_secret", &self.wp_app_secret),
            ("wp_identity_provider_id", &self.wp_identity_provider_id),
        ];
        for (name, value) in required {
            ensure!(!value.trim().is_empty(), "`{}` must not be empty", name);
        }

        ensure!(
            !self.discord_api_url.cannot_be_a_base(),
            "`discord_api_url` must be a base URL, got {}",
            self.discord_api_url
        );

        if let Some(field) = &self.custom_field {
            ensure!(
                !field.property.trim().is_empty(),
                "`custom_field.property` must not be empty"
            );
        }

        Ok(())
    }
}

// secrets stay out of logs
impl fmt::Debug for RosterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RosterConfig")
            .field("discord_token", &redacted(&self.discord_token))
            .field("discord_guild_id", &self.discord_guild_id)
            .field("discord_api_url", &self.discord_api_url.as_str())
            .field("wp_webhook_secret", &redacted(&self.wp_webhook_secret))
            .field("wp_app_id", &self.wp_app_id)
            .field("wp_app_secret", &redacted(&self.wp_app_secret))
            .field("wp_identity_provider_id", &self.wp_identity_provider_id)
            .field("wp_graphql_url", &self.wp_graphql_url.as_str())
            .field(
                "wp_graphql_headers",
                &self.wp_graphql_headers.keys().collect::<Vec<_>>(),
            )
            .field("custom_field", &self.custom_field)
            .finish()
    }
}

fn redacted(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
discord_token: bot-token
discord_guild_id: "1122334455"
wp_webhook_secret: whsec
wp_app_id: app
wp_app_secret: app-secret
wp_identity_provider_id: idp-discord
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: RosterConfig = serde_yaml::from_str(MINIMAL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.discord_api_url.as_str(), "https://discord.com/api/v10");
        assert_eq!(
            config.wp_graphql_url.as_str(),
            "https://api.warrior.well-played.gg/graphql"
        );
        assert!(config.wp_graphql_headers.is_empty());
        assert_eq!(config.custom_field, None);
    }

    #[test]
    fn custom_field_and_headers() {
        let yaml = format!(
            "{}\nwp_graphql_headers:\n  organization-id: org-1\ncustom_field:\n  property: discord\n  value: synced\n",
            MINIMAL
        );
        let config: RosterConfig = serde_yaml::from_str(&yaml).unwrap();
        config.validate().unwrap();

        assert_eq!(
            config.wp_graphql_headers.get("organization-id").map(String::as_str),
            Some("org-1")
        );
        assert_eq!(
            config.custom_field,
            Some(CustomFieldMapping {
                property: "discord".to_string(),
                value: "synced".to_string(),
            })
        );
    }

    #[test]
    fn empty_secret_is_rejected() {
        let yaml = MINIMAL.replace("wp_webhook_secret: whsec", "wp_webhook_secret: \"\"");
        let config: RosterConfig = serde_yaml::from_str(&yaml).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("wp_webhook_secret"));
    }

    #[test]
    fn missing_field_fails_to_parse() {
        let yaml = MINIMAL.replace("wp_app_id: app\n", "");
        assert!(serde_yaml::from_str::<RosterConfig>(&yaml).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config: RosterConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("bot-token"));
        assert!(!debug.contains("whsec"));
        assert!(!debug.contains("app-secret"));
        assert!(debug.contains("idp-discord"));
    }
}
