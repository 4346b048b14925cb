//! Compact callback payloads for inline keyboard buttons.
//!
//! Telegram rejects `callback_data` longer than 64 bytes, so every variant is
//! encoded as a 2-3 character prefix followed by colon-separated positional
//! fields. JSON would not fit.
//!
//! | prefix | variant          | fields                    |
//! |--------|------------------|---------------------------|
//! | `rd`   | race details     | race id                   |
//! | `rr`   | race reminder    | race id, `set`/`cancel`   |
//! | `rl`   | race location    | race id                   |
//! | `ls`   | races list       | distance (optional)       |
//! | `rf`   | races filter     | distance                  |
//! | `rs`   | races search     | start, end distance       |
//! | `uc`   | user config      | action, value (optional)  |
//! | `nav`  | navigation       | action, target            |
//! | `pag`  | pagination       | action, page, target      |

use std::{fmt, str::FromStr};

/// Hard limit imposed by the Bot API on `callback_data`.
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

const SEP: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("unrecognized callback prefix `{0}`")]
    UnrecognizedPrefix(String),

    #[error("callback `{prefix}` is missing field `{field}`")]
    MissingField {
        prefix: &'static str,
        field: &'static str,
    },

    #[error("callback field `{field}` has invalid value `{value}`")]
    InvalidField { field: &'static str, value: String },
}

/// What an inline button press means.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackData {
    RaceDetails {
        race_id: String,
    },
    RaceReminder {
        race_id: String,
        action: ReminderAction,
    },
    RaceLocation {
        race_id: String,
    },
    RacesList {
        distance: Option<u32>,
    },
    RacesFilter {
        distance: u32,
    },
    RacesSearch {
        start_distance: u32,
        end_distance: u32,
    },
    UserConfig {
        action: ConfigAction,
        value: Option<String>,
    },
    Navigation {
        action: NavAction,
        target: String,
    },
    Pagination {
        action: PageAction,
        page: u32,
        target: String,
    },
}

/// Declares a string-literal enum used inside callback payloads.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $field:literal { $($variant:ident => $lit:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $lit),+
                }
            }
        }

        impl FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($lit => Ok(Self::$variant),)+
                    other => Err(CodecError::InvalidField {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Whether a reminder is being turned on or off.
    ReminderAction, "action" {
        Set => "set",
        Cancel => "cancel",
    }
);

wire_enum!(
    /// Settings screen actions.
    ConfigAction, "action" {
        Menu => "menu",
        Distances => "distances",
        ToggleDistance => "toggle_distance",
        Notifications => "notifications",
        ReminderTime => "reminder_time",
    }
);

wire_enum!(
    NavAction, "action" {
        Back => "back",
        Home => "home",
    }
);

wire_enum!(
    PageAction, "action" {
        Next => "next",
        Prev => "prev",
        Page => "page",
    }
);

impl CallbackData {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::RaceDetails { .. } => "rd",
            Self::RaceReminder { .. } => "rr",
            Self::RaceLocation { .. } => "rl",
            Self::RacesList { .. } => "ls",
            Self::RacesFilter { .. } => "rf",
            Self::RacesSearch { .. } => "rs",
            Self::UserConfig { .. } => "uc",
            Self::Navigation { .. } => "nav",
            Self::Pagination { .. } => "pag",
        }
    }

    pub fn encode(&self) -> String {
        serialize(self)
    }

    pub fn decode(raw: &str) -> Result<Self, CodecError> {
        deserialize(raw)
    }
}

impl fmt::Display for CallbackData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&serialize(self))
    }
}

impl FromStr for CallbackData {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        deserialize(s)
    }
}

/// Encode a payload into its wire form.
pub fn serialize(data: &CallbackData) -> String {
    let prefix = data.prefix();
    match data {
        CallbackData::RaceDetails { race_id } | CallbackData::RaceLocation { race_id } => {
            format!("{prefix}{SEP}{race_id}")
        }
        CallbackData::RaceReminder { race_id, action } => {
            format!("{prefix}{SEP}{race_id}{SEP}{action}")
        }
        CallbackData::RacesList { distance: None } => prefix.to_string(),
        CallbackData::RacesList {
            distance: Some(distance),
        }
        | CallbackData::RacesFilter { distance } => format!("{prefix}{SEP}{distance}"),
        CallbackData::RacesSearch {
            start_distance,
            end_distance,
        } => format!("{prefix}{SEP}{start_distance}{SEP}{end_distance}"),
        CallbackData::UserConfig {
            action,
            value: None,
        } => format!("{prefix}{SEP}{action}"),
        CallbackData::UserConfig {
            action,
            value: Some(value),
        } => format!("{prefix}{SEP}{action}{SEP}{value}"),
        CallbackData::Navigation { action, target } => {
            format!("{prefix}{SEP}{action}{SEP}{target}")
        }
        CallbackData::Pagination {
            action,
            page,
            target,
        } => format!("{prefix}{SEP}{action}{SEP}{page}{SEP}{target}"),
    }
}

/// Decode a wire string back into a payload.
///
/// The last free-form string field of a variant takes the remainder of the
/// input, so values containing `:` survive a round trip.
pub fn deserialize(raw: &str) -> Result<CallbackData, CodecError> {
    let (prefix, rest) = match raw.split_once(SEP) {
        Some((prefix, rest)) => (prefix, Some(rest)),
        None => (raw, None),
    };
    let mut fields = Fields::new(prefix_name(prefix)?, rest);

    let data = match prefix {
        "rd" => CallbackData::RaceDetails {
            race_id: fields.rest("race_id")?,
        },
        "rr" => {
            // The action is last, so the id gets everything before the final separator.
            let tail = fields.rest("race_id")?;
            let (race_id, action) = tail.rsplit_once(SEP).ok_or(CodecError::MissingField {
                prefix: "rr",
                field: "action",
            })?;
            CallbackData::RaceReminder {
                race_id: non_empty_field("race_id", race_id)?,
                action: action.parse()?,
            }
        }
        "rl" => CallbackData::RaceLocation {
            race_id: fields.rest("race_id")?,
        },
        "ls" => CallbackData::RacesList {
            distance: fields.optional_number("distance")?,
        },
        "rf" => CallbackData::RacesFilter {
            distance: fields.number("distance")?,
        },
        "rs" => CallbackData::RacesSearch {
            start_distance: fields.number("start_distance")?,
            end_distance: fields.number("end_distance")?,
        },
        "uc" => CallbackData::UserConfig {
            action: fields.next("action")?.parse()?,
            value: fields.optional_rest(),
        },
        "nav" => CallbackData::Navigation {
            action: fields.next("action")?.parse()?,
            target: fields.rest("target")?,
        },
        "pag" => CallbackData::Pagination {
            action: fields.next("action")?.parse()?,
            page: fields.number("page")?,
            target: fields.rest("target")?,
        },
        other => return Err(CodecError::UnrecognizedPrefix(other.to_string())),
    };

    Ok(data)
}

/// UTF-8 byte length of the serialized payload.
pub fn get_size(data: &CallbackData) -> usize {
    serialize(data).len()
}

/// Whether the serialized payload fits the platform limit.
pub fn validate_size(data: &CallbackData) -> bool {
    get_size(data) <= MAX_CALLBACK_DATA_BYTES
}

fn prefix_name(prefix: &str) -> Result<&'static str, CodecError> {
    const KNOWN: [&str; 9] = ["rd", "rr", "rl", "ls", "rf", "rs", "uc", "nav", "pag"];
    KNOWN
        .into_iter()
        .find(|k| *k == prefix)
        .ok_or_else(|| CodecError::UnrecognizedPrefix(prefix.to_string()))
}

fn non_empty_field(field: &'static str, value: &str) -> Result<String, CodecError> {
    if value.is_empty() {
        return Err(CodecError::InvalidField {
            field,
            value: String::new(),
        });
    }
    Ok(value.to_string())
}

/// Positional field reader over the part after the prefix.
struct Fields<'a> {
    prefix: &'static str,
    rest: Option<&'a str>,
}

impl<'a> Fields<'a> {
    fn new(prefix: &'static str, rest: Option<&'a str>) -> Self {
        Self { prefix, rest }
    }

    fn missing(&self, field: &'static str) -> CodecError {
        CodecError::MissingField {
            prefix: self.prefix,
            field,
        }
    }

    fn next(&mut self, field: &'static str) -> Result<&'a str, CodecError> {
        let rest = self.rest.take().ok_or_else(|| self.missing(field))?;
        let (head, tail) = match rest.split_once(SEP) {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        self.rest = tail;
        if head.is_empty() {
            return Err(self.missing(field));
        }
        Ok(head)
    }

    fn number(&mut self, field: &'static str) -> Result<u32, CodecError> {
        let raw = self.next(field)?;
        raw.parse().map_err(|_| CodecError::InvalidField {
            field,
            value: raw.to_string(),
        })
    }

    fn optional_number(&mut self, field: &'static str) -> Result<Option<u32>, CodecError> {
        if self.rest.is_none() {
            return Ok(None);
        }
        self.number(field).map(Some)
    }

    fn rest(&mut self, field: &'static str) -> Result<String, CodecError> {
        match self.rest.take() {
            Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
            _ => Err(self.missing(field)),
        }
    }

    fn optional_rest(&mut self) -> Option<String> {
        self.rest.take().filter(|s| !s.is_empty()).map(str::to_string)
    }
}
