use std::sync::LazyLock;

use regex::Regex;
use scraper::Selector;

macro_rules! selector {
    ($name:ident, $css:expr) => {
        pub(crate) static $name: LazyLock<Selector> =
            LazyLock::new(|| Selector::parse($css).expect("valid selector"));
    };
}

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($regex).expect("valid regex"));
    };
}

// Listing pages
regex!(TITLE_LINK_REGEX, r"(?i)/title/(tt\d{5,})");
regex!(BARE_TITLE_ID_REGEX, r"(?i)\b(tt\d{7,})\b");
regex!(RELAY_TITLE_REGEX, r"(?m)^Title:\s*(.+?)\s*$");
selector!(H1_SELECTOR, "h1");
selector!(OG_TITLE_SELECTOR, r#"meta[property="og:title"]"#);
selector!(TITLE_SELECTOR, "title");

// Title detail pages
selector!(LD_JSON_SELECTOR, r#"script[type="application/ld+json"]"#);
selector!(OG_TYPE_SELECTOR, r#"meta[property="og:type"]"#);
selector!(OG_IMAGE_SELECTOR, r#"meta[property="og:image"]"#);
selector!(
    PARENT_LINK_SELECTOR,
    r#"a[data-testid="hero-title-block__series-link"], a[data-testid="tm-box-up-title"], a[data-testid="title-episode-series-link"]"#
);
selector!(PARENT_ATTR_SELECTOR, "[data-parent-id], [data-parent-tconst]");
selector!(ANCHOR_SELECTOR, "a[href]");
regex!(TITLE_ID_REGEX, r"(?i)(tt\d{5,})");
regex!(PAREN_LABEL_REGEX, r"\(([^()]*)\)\s*(?:-\s*IMDb\s*)?$");
regex!(YEAR_REGEX, r"\b(\d{4})\b");
