use std::borrow::Cow;
use unicode_segmentation::UnicodeSegmentation;

#[macro_export]
macro_rules! submodule {
    ($name:ident) => {
        mod $name;
        pub use $name::*;
    };
}

pub fn str_width(string: &str) -> usize {
    string.graphemes(true).count()
}

pub fn to_lines(text: impl Into<Cow<'static, str>>) -> Vec<Cow<'static, str>> {
    let text = text.into();
    if text.is_empty() {
        // Return at least one empty line
        return vec!["".into()];
    }

    text.lines().map(|line| line.to_owned().into()).collect()
}
