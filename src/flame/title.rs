//! Frame-type classification from frame titles.

use crate::FrameType;

/// Counter a suffix feeds on the node it lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TitleCounter {
    Inlined,
    C1,
    Interpreted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClassifiedTitle<'a> {
    /// Key under which the node is stored.
    pub key: &'a str,
    pub frame_type: FrameType,
    pub counter: Option<TitleCounter>,
}

impl<'a> ClassifiedTitle<'a> {
    fn new(key: &'a str, frame_type: FrameType, counter: Option<TitleCounter>) -> Self {
        Self {
            key,
            frame_type,
            counter,
        }
    }
}

pub(crate) const KERNEL_SUFFIX: &str = "_[k]";

pub(crate) fn classify(title: &str) -> ClassifiedTitle<'_> {
    let suffixed = |suffix: &str| title.strip_suffix(suffix);

    if let Some(key) = suffixed("_[j]") {
        return ClassifiedTitle::new(key, FrameType::JitCompiled, None);
    }
    if let Some(key) = suffixed("_[i]") {
        return ClassifiedTitle::new(key, FrameType::JitCompiled, Some(TitleCounter::Inlined));
    }
    if title.ends_with(KERNEL_SUFFIX) {
        // kept in the key so a kernel symbol never merges with a native one
        return ClassifiedTitle::new(title, FrameType::Kernel, None);
    }
    if let Some(key) = suffixed("_[1]") {
        return ClassifiedTitle::new(key, FrameType::JitCompiled, Some(TitleCounter::C1));
    }
    if let Some(key) = suffixed("_[0]") {
        return ClassifiedTitle::new(key, FrameType::JitCompiled, Some(TitleCounter::Interpreted));
    }

    let frame_type = if title.contains("::") || title.starts_with("-[") || title.starts_with("+[") {
        FrameType::Cpp
    } else if is_java_name(title) {
        FrameType::JitCompiled
    } else {
        FrameType::Native
    };
    ClassifiedTitle::new(title, frame_type, None)
}

fn is_java_name(title: &str) -> bool {
    let slash_qualified = title.find('/').is_some_and(|i| i > 0) && !title.starts_with('[');
    let capitalized_dotted = title.find('.').is_some_and(|i| i > 0)
        && title.chars().next().is_some_and(char::is_uppercase);
    slash_qualified || capitalized_dotted
}

/// Title as rendered, without the kernel marker.
pub(crate) fn display_title(key: &str) -> &str {
    key.strip_suffix(KERNEL_SUFFIX).unwrap_or(key)
}
