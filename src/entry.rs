use alloc::string::String;
use core::fmt;

/// A single directory record: a person's name and their phone number.
///
/// `Entry` is a plain value. A [`Directory`](crate::Directory) stores its own
/// copy and hands out copies, so nothing a caller holds aliases the table.
///
/// The [`Display`](fmt::Display) rendering is
/// `{ name: "<name>", phone_number: "<phone_number>" }`.
///
/// # Examples
///
/// ```rust
/// use chain_directory::Entry;
///
/// let entry = Entry::new("John Snow", "+485327095");
/// assert_eq!(entry.name(), "John Snow");
/// assert_eq!(
///     entry.to_string(),
///     r#"{ name: "John Snow", phone_number: "+485327095" }"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    name: String,
    phone_number: String,
}

impl Entry {
    /// Creates a new record.
    pub fn new(name: impl Into<String>, phone_number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone_number: phone_number.into(),
        }
    }

    /// The name this record is keyed by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The phone number.
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ name: \"{}\", phone_number: \"{}\" }}",
            self.name, self.phone_number
        )
    }
}

impl From<(&str, &str)> for Entry {
    fn from((name, phone_number): (&str, &str)) -> Self {
        Self::new(name, phone_number)
    }
}

impl From<(String, String)> for Entry {
    fn from((name, phone_number): (String, String)) -> Self {
        Self { name, phone_number }
    }
}
