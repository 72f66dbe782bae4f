//! # Messages Module
//!
//! User-facing replies rendered from the Fluent catalog compiled into the
//! binary.

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use unic_langid::LanguageIdentifier;

const CATALOG_LOCALE: &str = "ru";
const CATALOG: &str = include_str!("../locales/ru/main.ftl");

/// Message catalog shared by every conversation
pub struct Messages {
    bundle: FluentBundle<FluentResource>,
}

impl std::fmt::Debug for Messages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Messages")
            .field("locale", &CATALOG_LOCALE)
            .finish()
    }
}

impl Messages {
    /// Load the built-in catalog
    pub fn new() -> Result<Self> {
        Self::from_source(CATALOG)
    }

    /// Load a catalog from Fluent source text
    pub fn from_source(source: &str) -> Result<Self> {
        let locale: LanguageIdentifier = CATALOG_LOCALE.parse()?;
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Replies are plain text; bidi isolation marks would leak into codes.
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid message catalog: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate message keys: {errors:?}"))?;

        Ok(Self { bundle })
    }

    /// Get a message without arguments
    pub fn get(&self, key: &str) -> String {
        self.render(key, None)
    }

    /// Get a message with simple string arguments
    pub fn get_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, *value);
        }
        self.render(key, Some(&fluent_args))
    }

    fn render(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let Some(message) = self.bundle.get_message(key) else {
            return format!("Missing translation: {key}");
        };
        let Some(pattern) = message.value() else {
            return format!("Missing value for key: {key}");
        };

        let mut errors = vec![];
        let value = self.bundle.format_pattern(pattern, args, &mut errors);
        if !errors.is_empty() {
            tracing::warn!(key, ?errors, "Message rendered with errors");
        }
        value.into_owned()
    }
}
