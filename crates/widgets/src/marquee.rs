//! Scrolling info text

use serde::Deserialize;

/// Contents of the marquee resource
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Marquee {
    /// Text shown verbatim
    pub infos: String,
}

impl Marquee {
    pub fn text(&self) -> &str {
        &self.infos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_verbatim() {
        let marquee: Marquee =
            serde_json::from_str(r#"{"infos": "  Heute: Tag der offenen Tür!  "}"#).unwrap();
        assert_eq!(marquee.text(), "  Heute: Tag der offenen Tür!  ");
    }

    #[test]
    fn test_missing_infos_is_rejected() {
        assert!(serde_json::from_str::<Marquee>(r#"{"info": "x"}"#).is_err());
    }
}
