//! Variant composition.
//!
//! Merges the variants collected from a chained access (`tw.md.hover`) with the variant
//! prefixes already written inside the class strings (`"focus:ring"`). Each class token is
//! emitted as
//!
//! ```text
//! screen? dark? outer-variants-not-in-token token-variants class
//! ```
//!
//! joined by the configured separator.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::config::TailwindConfig;

pub const DARK: &str = "dark";

static UPPERCASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]").expect("uppercase regex"));

/// `focusVisible` -> `focus-visible`. Already kebab-cased names pass through.
pub fn kebab_case(name: &str) -> String {
    let kebab = UPPERCASE.replace_all(name, |caps: &Captures| {
        format!("-{}", caps[0].to_lowercase())
    });
    if name.starts_with(|c: char| c.is_ascii_uppercase()) {
        kebab[1..].to_string()
    } else {
        kebab.into_owned()
    }
}

/// Composes the final class string for one macro invocation.
pub fn compose(config: &TailwindConfig, variants: &[String], params: &[String]) -> String {
    let outer = OuterVariants::partition(config, variants);
    params
        .iter()
        .flat_map(|param| param.split_whitespace())
        .map(|item| outer.apply(&ClassToken::parse(config, item), &config.separator))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Variants accumulated from the access chain, outermost first.
#[derive(Debug, Default, PartialEq, Eq)]
struct OuterVariants {
    screen: Option<String>,
    dark: bool,
    variants: Vec<String>,
}

impl OuterVariants {
    fn partition(config: &TailwindConfig, input: &[String]) -> Self {
        let mut outer = Self::default();
        for variant in input {
            if variant == DARK {
                outer.dark = true;
            } else if config.is_screen(variant) {
                outer.screen = Some(variant.clone());
            } else {
                outer.variants.push(kebab_case(variant));
            }
        }
        outer
    }

    fn apply(&self, token: &ClassToken<'_>, separator: &str) -> String {
        let mut out = String::new();
        let mut segment = |s: &str| {
            out.push_str(s);
            out.push_str(separator);
        };

        // the chained screen wins over one written in the string
        if let Some(screen) = self.screen.as_deref().or(token.screen) {
            segment(screen);
        }
        if self.dark || token.dark {
            segment(DARK);
        }
        for variant in &self.variants {
            if !token.variants.contains(&variant.as_str()) {
                segment(variant);
            }
        }
        for variant in &token.variants {
            segment(variant);
        }

        out.push_str(token.class_name);
        out
    }
}

/// One whitespace-delimited class with its embedded variant prefixes.
#[derive(Debug, PartialEq, Eq)]
struct ClassToken<'a> {
    screen: Option<&'a str>,
    dark: bool,
    variants: Vec<&'a str>,
    class_name: &'a str,
}

impl<'a> ClassToken<'a> {
    fn parse(config: &TailwindConfig, item: &'a str) -> Self {
        let mut token = ClassToken {
            screen: None,
            dark: false,
            variants: Vec::new(),
            class_name: item,
        };
        if config.separator.is_empty() {
            return token;
        }

        let mut segments: Vec<&str> = item.split(config.separator.as_str()).collect();
        token.class_name = segments.pop().unwrap_or_default();
        for segment in segments {
            if segment == DARK {
                token.dark = true;
            } else if config.is_screen(segment) {
                token.screen = Some(segment);
            } else {
                token.variants.push(segment);
            }
        }
        token
    }
}
