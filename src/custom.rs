//! Hand-pickable settings and the key space the tool knows by name.

use serde::Serialize;

use crate::bundle::Bundle;
use crate::error::BravetuneError;
use crate::setting::{Setting, Value};

/// Display order of toggle categories.
pub const CATEGORIES: [&str; 4] = [
    "Telemetry & Privacy",
    "Privacy & Security",
    "Brave Features",
    "Performance & Bloat",
];

/// One setting an operator can select for a custom bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toggle {
    pub key: &'static str,
    pub label: &'static str,
    /// What selecting the toggle does: "Disable", "Enable" or "Force".
    pub verb: &'static str,
    pub category: &'static str,
    #[serde(skip)]
    pub value: ToggleValue,
}

/// The value written when a toggle is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleValue {
    Bool(bool),
    Integer(i64),
    Str(&'static str),
}

impl Toggle {
    pub fn setting(&self) -> Result<Setting, BravetuneError> {
        let value = match self.value {
            ToggleValue::Bool(b) => Value::Bool(b),
            ToggleValue::Integer(n) => Value::Integer(n),
            ToggleValue::Str(s) => Value::Str(s.into()),
        };
        Setting::new(self.key, value)
    }
}

const fn toggle(
    key: &'static str,
    label: &'static str,
    value: ToggleValue,
    category: usize,
    verb: &'static str,
) -> Toggle {
    Toggle {
        key,
        label,
        verb,
        category: CATEGORIES[category],
        value,
    }
}

use ToggleValue::{Bool, Integer, Str};

const TELEMETRY: usize = 0;
const SECURITY: usize = 1;
const FEATURES: usize = 2;
const BLOAT: usize = 3;

static TOGGLES: [Toggle; 33] = [
    toggle("MetricsReportingEnabled", "Metrics Reporting", Bool(false), TELEMETRY, "Disable"),
    toggle("SafeBrowsingExtendedReportingEnabled", "Safe Browsing Extended Reporting", Bool(false), TELEMETRY, "Disable"),
    toggle("UrlKeyedAnonymizedDataCollectionEnabled", "URL Data Collection", Bool(false), TELEMETRY, "Disable"),
    toggle("FeedbackSurveysEnabled", "Feedback Surveys", Bool(false), TELEMETRY, "Disable"),
    toggle("SafeBrowsingProtectionLevel", "Safe Browsing", Integer(0), SECURITY, "Disable"),
    toggle("AutofillAddressEnabled", "Autofill (Addresses)", Bool(false), SECURITY, "Disable"),
    toggle("AutofillCreditCardEnabled", "Autofill (Credit Cards)", Bool(false), SECURITY, "Disable"),
    toggle("PasswordManagerEnabled", "Password Manager", Bool(false), SECURITY, "Disable"),
    toggle("BrowserSignin", "Browser Sign-in", Integer(0), SECURITY, "Disable"),
    toggle("WebRtcIPHandling", "WebRTC IP Leak", Str("disable_non_proxied_udp"), SECURITY, "Disable"),
    toggle("QuicAllowed", "QUIC Protocol", Bool(false), SECURITY, "Disable"),
    toggle("BlockThirdPartyCookies", "Block Third Party Cookies", Bool(true), SECURITY, "Enable"),
    toggle("EnableDoNotTrack", "Do Not Track", Bool(true), SECURITY, "Enable"),
    toggle("ForceGoogleSafeSearch", "Google SafeSearch", Bool(true), SECURITY, "Force"),
    toggle("IPFSEnabled", "IPFS", Bool(false), SECURITY, "Disable"),
    toggle("IncognitoModeAvailability", "Incognito Mode", Integer(1), SECURITY, "Disable"),
    toggle("BraveRewardsDisabled", "Brave Rewards", Bool(true), FEATURES, "Disable"),
    toggle("BraveWalletDisabled", "Brave Wallet", Bool(true), FEATURES, "Disable"),
    toggle("BraveVPNDisabled", "Brave VPN", Bool(true), FEATURES, "Disable"),
    toggle("BraveAIChatEnabled", "Brave AI Chat", Bool(false), FEATURES, "Disable"),
    toggle("TorDisabled", "Tor", Bool(true), FEATURES, "Disable"),
    toggle("SyncDisabled", "Sync", Bool(true), FEATURES, "Disable"),
    toggle("BackgroundModeEnabled", "Background Mode", Bool(false), BLOAT, "Disable"),
    toggle("MediaRecommendationsEnabled", "Media Recommendations", Bool(false), BLOAT, "Disable"),
    toggle("ShoppingListEnabled", "Shopping List", Bool(false), BLOAT, "Disable"),
    toggle("AlwaysOpenPdfExternally", "Always Open PDF Externally", Bool(true), BLOAT, "Enable"),
    toggle("TranslateEnabled", "Translate", Bool(false), BLOAT, "Disable"),
    toggle("SpellcheckEnabled", "Spellcheck", Bool(false), BLOAT, "Disable"),
    toggle("PromotionsEnabled", "Promotions", Bool(false), BLOAT, "Disable"),
    toggle("SearchSuggestEnabled", "Search Suggestions", Bool(false), BLOAT, "Disable"),
    toggle("PrintingEnabled", "Printing", Bool(false), BLOAT, "Disable"),
    toggle("DefaultBrowserSettingEnabled", "Default Browser Prompt", Bool(false), BLOAT, "Disable"),
    toggle("DeveloperToolsDisabled", "Developer Tools", Bool(true), BLOAT, "Disable"),
];

/// Every toggle, grouped by category in [`CATEGORIES`] order.
pub fn toggles() -> &'static [Toggle] {
    &TOGGLES
}

pub fn find_toggle(key: &str) -> Option<&'static Toggle> {
    TOGGLES.iter().find(|t| t.key == key)
}

/// The custom bundle for a selection of toggle keys, in selection order.
/// Repeated keys are taken once.
pub fn bundle_for<I, K>(keys: I) -> Result<Bundle, BravetuneError>
where
    I: IntoIterator<Item = K>,
    K: AsRef<str>,
{
    let mut bundle = Bundle::new();
    for key in keys {
        let key = key.as_ref();
        let toggle = find_toggle(key).ok_or_else(|| BravetuneError::UnknownToggle(key.into()))?;
        if !bundle.contains_key(toggle.key) {
            bundle.push_unchecked(toggle.setting()?);
        }
    }
    if bundle.is_empty() {
        return Err(BravetuneError::EmptyBundle {
            origin: "custom selection".into(),
        });
    }
    Ok(bundle)
}

/// Keys shown by "current" and written by export, before anything else.
const WELL_KNOWN: [&str; 16] = [
    "MetricsReportingEnabled",
    "SafeBrowsingExtendedReportingEnabled",
    "UrlKeyedAnonymizedDataCollectionEnabled",
    "FeedbackSurveysEnabled",
    "BraveRewardsDisabled",
    "BraveWalletDisabled",
    "BraveVPNDisabled",
    "BraveAIChatEnabled",
    "TorDisabled",
    "SyncDisabled",
    "ShoppingListEnabled",
    "AlwaysOpenPdfExternally",
    "TranslateEnabled",
    "SpellcheckEnabled",
    "PromotionsEnabled",
    "DnsOverHttpsMode",
];

/// An ordered, duplicate-free list of preference keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpace {
    keys: Vec<String>,
}

impl KeySpace {
    /// The headline keys only.
    pub fn headline() -> Self {
        let mut space = Self::default();
        space.extend(WELL_KNOWN);
        space
    }

    /// The headline keys followed by every toggle key.
    pub fn well_known() -> Self {
        let mut space = Self::headline();
        space.extend(TOGGLES.iter().map(|t| t.key));
        space
    }

    /// Append keys not already present, keeping order.
    pub fn extend<I, K>(&mut self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        for key in keys {
            let key = key.as_ref();
            if !self.contains(key) {
                self.keys.push(key.to_string());
            }
        }
    }

    pub fn with_bundle(mut self, bundle: &Bundle) -> Self {
        self.extend(bundle.keys());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate;

    #[test]
    fn toggles_are_grouped_in_category_order() {
        let mut last = 0;
        for t in toggles() {
            let idx = CATEGORIES.iter().position(|c| *c == t.category).unwrap();
            assert!(idx >= last, "{} out of order", t.key);
            last = idx;
        }
    }

    #[test]
    fn toggle_keys_are_valid_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for t in toggles() {
            validate::check_key(t.key).unwrap();
            assert!(seen.insert(t.key), "duplicate {}", t.key);
            t.setting().unwrap();
        }
    }

    #[test]
    fn bundle_for_selection() {
        let b = bundle_for(["WebRtcIPHandling", "BraveRewardsDisabled", "WebRtcIPHandling"]).unwrap();
        assert_eq!(b.len(), 2);
        assert_eq!(
            b.get("WebRtcIPHandling").unwrap().value(),
            &Value::Str("disable_non_proxied_udp".into())
        );
        assert_eq!(b.get("BraveRewardsDisabled").unwrap().value(), &Value::Bool(true));
    }

    #[test]
    fn bundle_for_unknown_key_fails() {
        let err = bundle_for(["NotAToggle"]).unwrap_err();
        assert!(matches!(err, BravetuneError::UnknownToggle(k) if k == "NotAToggle"));
        assert!(bundle_for(Vec::<String>::new()).is_err());
    }

    #[test]
    fn key_space_orders_headline_then_toggles_without_duplicates() {
        let space = KeySpace::well_known();
        let keys: Vec<&str> = space.iter().collect();
        assert_eq!(keys[0], "MetricsReportingEnabled");
        assert_eq!(keys[15], "DnsOverHttpsMode");
        assert_eq!(keys[16], "SafeBrowsingProtectionLevel");

        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn key_space_appends_declared_keys() {
        let extra = bundle_for(["TorDisabled"]).unwrap();
        let mut space = KeySpace::headline();
        let before = space.len();
        space.extend(["BraveP3AEnabled", "TorDisabled"]);
        assert_eq!(space.len(), before + 1);
        let space = space.with_bundle(&extra);
        assert_eq!(space.len(), before + 1);
        assert_eq!(space.iter().last(), Some("BraveP3AEnabled"));
    }
}
