use std::fmt;

/// Owned element locator, so adapters can build selectors at runtime
/// and hand them around without lifetime juggling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn id(id: impl Into<String>) -> Self {
        Locator::Id(id.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    pub fn xpath(path: impl Into<String>) -> Self {
        Locator::XPath(path.into())
    }

    pub fn class(name: &str) -> Self {
        Locator::Css(format!(".{}", name))
    }

    pub fn tag(name: &str) -> Self {
        Locator::Css(name.to_string())
    }

    pub fn as_fantoccini(&self) -> fantoccini::Locator<'_> {
        match self {
            Locator::Id(id) => fantoccini::Locator::Id(id),
            Locator::Css(css) => fantoccini::Locator::Css(css),
            Locator::XPath(xpath) => fantoccini::Locator::XPath(xpath),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "#{}", id),
            Locator::Css(css) => f.write_str(css),
            Locator::XPath(xpath) => write!(f, "xpath={}", xpath),
        }
    }
}
