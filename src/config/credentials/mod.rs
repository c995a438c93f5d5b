use super::schema::Config;

macro_rules! define_credentials {
    ($( $name:literal, $env:literal => $section:ident . $field:ident );* $(;)?) => {
        /// All known credential slot names.
        pub const CREDENTIAL_NAMES: &[&str] = &[$($name),*];

        /// (slot name, env var name) pairs.
        pub const CREDENTIAL_ENV_VARS: &[(&str, &str)] = &[$(($name, $env)),*];

        /// Get the current value of a credential field by slot name.
        ///
        /// Returns `None` for unknown slots and for slots whose destination is not configured.
        pub fn get_credential_value<'a>(config: &'a Config, name: &str) -> Option<&'a str> {
            match name {
                $($name => config.$section.as_ref().map(|s| s.$field.as_str()),)*
                _ => None,
            }
        }

        /// Apply environment variable overrides.
        ///
        /// Any `TXTPOST_*` env var that is set and non-empty will overwrite the
        /// corresponding config field, allowing secrets to be injected without
        /// touching the config file (useful for containers and CI). Overrides
        /// only apply to destinations that are present in the config; an env
        /// var alone never enables a destination.
        pub fn apply_env_overrides(config: &mut Config) {
            apply_overrides_from(config, |key| std::env::var(key).ok());
        }

        pub(crate) fn apply_overrides_from<F>(config: &mut Config, lookup: F)
        where
            F: Fn(&str) -> Option<String>,
        {
            $(
                if let Some(val) = lookup($env)
                    && !val.is_empty()
                    && let Some(section) = config.$section.as_mut()
                {
                    section.$field = val;
                }
            )*
        }
    };
}

define_credentials! {
    "microblog-token",             "TXTPOST_MICROBLOG_TOKEN"             => microblog.token;
    "social-consumer-key",         "TXTPOST_SOCIAL_CONSUMER_KEY"         => social.consumer_key;
    "social-consumer-secret",      "TXTPOST_SOCIAL_CONSUMER_SECRET"      => social.consumer_secret;
    "social-access-token",         "TXTPOST_SOCIAL_ACCESS_TOKEN"         => social.access_token;
    "social-access-token-secret",  "TXTPOST_SOCIAL_ACCESS_TOKEN_SECRET"  => social.access_token_secret;
}

/// Honeybadger key override; kept outside the macro because the section is not optional.
pub(crate) fn apply_reporting_override_from<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup("TXTPOST_HONEYBADGER_API_KEY")
        && !val.is_empty()
    {
        config.error_reporting.honeybadger_api_key = val;
    }
}
