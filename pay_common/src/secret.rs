use std::{
    fmt,
    fmt::{Debug, Display},
};

use serde::{Deserialize, Serialize};

/// A value that must never show up in logs, e.g. a card security code.
///
/// `Debug` and `Display` are masked. Use [`Secret::reveal`] where the real value is needed, such as comparing a
/// presented card against the stored one.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn secrets_are_masked() {
        let cvc = Secret::new("999".to_string());
        assert_eq!(format!("{cvc}"), "****");
        assert_eq!(format!("{cvc:?}"), "****");
        assert_eq!(cvc.reveal(), "999");
    }

    #[test]
    fn secrets_compare_by_value() {
        assert_eq!(Secret::new("123".to_string()), Secret::from("123".to_string()));
        assert_ne!(Secret::new("123".to_string()), Secret::from("124".to_string()));
    }
}
