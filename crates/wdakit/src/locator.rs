//! Element search strategies.

use std::fmt;

use serde::Serialize;

/// How to search for elements, one variant per WebDriver strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Locator {
    /// Element type, e.g. `XCUIElementTypeButton`.
    ClassName(String),
    Name(String),
    Id(String),
    AccessibilityId(String),
    /// Exact label match.
    LinkText(String),
    /// Substring label match.
    PartialLinkText(String),
    /// `NSPredicate` format string, e.g. `label == 'OK' AND enabled == 1`.
    Predicate(String),
    /// XCUITest class chain, e.g. `**/XCUIElementTypeCell[2]`.
    ClassChain(String),
    XPath(String),
}

impl Locator {
    /// The WebDriver `using` name of this strategy.
    pub fn using(&self) -> &'static str {
        match self {
            Locator::ClassName(_) => "class name",
            Locator::Name(_) => "name",
            Locator::Id(_) => "id",
            Locator::AccessibilityId(_) => "accessibility id",
            Locator::LinkText(_) => "link text",
            Locator::PartialLinkText(_) => "partial link text",
            Locator::Predicate(_) => "predicate string",
            Locator::ClassChain(_) => "class chain",
            Locator::XPath(_) => "xpath",
        }
    }

    /// The search value.
    pub fn value(&self) -> &str {
        match self {
            Locator::ClassName(v)
            | Locator::Name(v)
            | Locator::Id(v)
            | Locator::AccessibilityId(v)
            | Locator::LinkText(v)
            | Locator::PartialLinkText(v)
            | Locator::Predicate(v)
            | Locator::ClassChain(v)
            | Locator::XPath(v) => v,
        }
    }

    pub(crate) fn body(&self) -> FindBody<'_> {
        FindBody {
            using: self.using(),
            value: self.value(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.using(), self.value())
    }
}

/// Body of `POST .../element(s)`.
#[derive(Debug, Serialize)]
pub(crate) struct FindBody<'a> {
    using: &'static str,
    value: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strategy_names() {
        let cases = [
            (Locator::ClassName("c".into()), "class name"),
            (Locator::Name("n".into()), "name"),
            (Locator::Id("i".into()), "id"),
            (Locator::AccessibilityId("a".into()), "accessibility id"),
            (Locator::LinkText("l".into()), "link text"),
            (Locator::PartialLinkText("p".into()), "partial link text"),
            (Locator::Predicate("p".into()), "predicate string"),
            (Locator::ClassChain("c".into()), "class chain"),
            (Locator::XPath("x".into()), "xpath"),
        ];
        for (locator, using) in cases {
            assert_eq!(locator.using(), using);
        }
    }

    #[test]
    fn find_body_shape() {
        let locator = Locator::Predicate("label == 'OK'".into());
        assert_eq!(
            serde_json::to_value(locator.body()).unwrap(),
            json!({"using": "predicate string", "value": "label == 'OK'"})
        );
        assert_eq!(locator.to_string(), "predicate string=label == 'OK'");
    }
}
