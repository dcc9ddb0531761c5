use std::collections::{BTreeMap, HashMap};

/// Icon used when a table carries no `"default"` entry.
pub const FALLBACK_ICON: &str = "?";

const DEFAULT_KEY: &str = "default";

/// Built-in condition table, keyed by OpenWeather condition descriptions.
///
/// Icon codes:
/// - `0` cloudy, `1` fog/mist, `2` snow showers, `3` sleet or rain/snow mix
/// - `4` partly cloudy, `5` thunderstorm, `6` heavy rain, `7` light/moderate rain
/// - `8` snow, `9` clear, `;` windy, `<` tornado, `?` unknown
const DEFAULT_TABLE: &[(&str, &str)] = &[
    ("clear sky", "9"),
    ("clear", "9"),
    ("sunny", "9"),
    ("few clouds", "4"),
    ("scattered clouds", "4"),
    ("partly cloudy", "4"),
    ("broken clouds", "0"),
    ("overcast clouds", "0"),
    ("overcast", "0"),
    ("cloudy", "0"),
    ("light rain", "7"),
    ("light intensity rain", "7"),
    ("drizzle", "7"),
    ("light intensity drizzle", "7"),
    ("moderate rain", "7"),
    ("heavy intensity rain", "6"),
    ("heavy rain", "6"),
    ("very heavy rain", "6"),
    ("extreme rain", "6"),
    ("rain", "7"),
    ("light intensity shower rain", "7"),
    ("shower rain", "7"),
    ("thunderstorm", "5"),
    ("thunderstorm with light rain", "5"),
    ("thunderstorm with rain", "5"),
    ("thunderstorm with heavy rain", "5"),
    ("light thunderstorm", "5"),
    ("heavy thunderstorm", "5"),
    ("ragged thunderstorm", "5"),
    ("snow", "8"),
    ("light snow", "8"),
    ("heavy snow", "8"),
    ("sleet", "3"),
    ("light shower sleet", "3"),
    ("shower sleet", "3"),
    ("light rain and snow", "3"),
    ("rain and snow", "3"),
    ("light shower snow", "2"),
    ("shower snow", "2"),
    ("heavy shower snow", "8"),
    ("mist", "1"),
    ("fog", "1"),
    ("haze", "1"),
    ("smoke", "1"),
    ("dust", "1"),
    ("sand", "1"),
    ("windy", ";"),
    ("squalls", ";"),
    ("tornado", "<"),
    (DEFAULT_KEY, FALLBACK_ICON),
];

/// Maps free-text weather conditions to short icon codes.
///
/// Keys are lowercased and trimmed once at construction, so lookups are a
/// single hash probe after normalizing the query the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconMapper {
    mappings: HashMap<String, String>,
    default_icon: String,
}

impl IconMapper {
    /// Build a mapper from condition/icon pairs.
    ///
    /// When two keys normalize to the same string the later one wins. The
    /// default icon comes from the literal `"default"` key, falling back to `"?"`.
    pub fn new<I, K, V>(mappings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut normalized = HashMap::new();
        let mut default_icon = None;

        for (key, icon) in mappings {
            let key = key.as_ref();
            let icon = icon.into();
            if key == DEFAULT_KEY {
                default_icon = Some(icon.clone());
            }
            normalized.insert(normalize(key), icon);
        }

        Self {
            mappings: normalized,
            default_icon: default_icon.unwrap_or_else(|| FALLBACK_ICON.to_string()),
        }
    }

    /// Icon code for `condition`, or the default icon when it is not mapped.
    pub fn map_condition(&self, condition: &str) -> &str {
        self.mappings
            .get(&normalize(condition))
            .map(String::as_str)
            .unwrap_or(self.default_icon.as_str())
    }

    pub fn default_icon(&self) -> &str {
        &self.default_icon
    }

    /// The built-in condition table, including its `"default"` entry.
    pub fn default_mappings() -> BTreeMap<String, String> {
        DEFAULT_TABLE
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }
}

impl Default for IconMapper {
    fn default() -> Self {
        Self::new(DEFAULT_TABLE.iter().copied())
    }
}

fn normalize(condition: &str) -> String {
    condition.trim().to_lowercase()
}
