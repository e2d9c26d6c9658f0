//! Build attributes and the ordered sets that hold them.
//!
//! An [`Attribute`] is one piece of compile or link configuration. Targets own
//! an [`AttributeSet`] in which every entry carries a [`Visibility`]; the
//! propagation engine flattens those into [`EffectiveAttributes`].

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Whether an attribute or dependency is exported to dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Visibility {
    /// Visible to the owner and to every direct or transitive dependent.
    Public,
    /// Visible to the owner only.
    Private,
}

impl Visibility {
    /// Map a `public` boolean onto a visibility.
    #[must_use]
    pub const fn from_public(public: bool) -> Self {
        if public { Self::Public } else { Self::Private }
    }

    /// Whether the entry is exported.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Public)
    }
}

/// Source language of a compile unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// C, compiled with the `cc` rule.
    C,
    /// C++, compiled with the `cxx` rule.
    Cxx,
}

impl Language {
    /// Flag group applied on top of [`FlagGroup::Common`] for this language.
    #[must_use]
    pub const fn flag_group(self) -> FlagGroup {
        match self {
            Self::C => FlagGroup::C,
            Self::Cxx => FlagGroup::Cxx,
        }
    }
}

/// Fixed set of flag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagGroup {
    /// Every compilation, C and C++ alike.
    Common,
    /// C compilation only.
    C,
    /// C++ compilation only.
    Cxx,
    /// Linking.
    Link,
    /// Static archive creation.
    Archive,
}

impl FlagGroup {
    /// Every group, in emission order.
    pub const ALL: [Self; 5] = [Self::Common, Self::C, Self::Cxx, Self::Link, Self::Archive];

    /// File-scope variable holding toolchain-wide flags of this group.
    #[must_use]
    pub const fn variable(self) -> &'static str {
        match self {
            Self::Common => "cflags",
            Self::C => "ccflags",
            Self::Cxx => "cxxflags",
            Self::Link => "linkflags",
            Self::Archive => "arflags",
        }
    }
}

/// One unit of build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Attribute {
    /// Raw tool flag for the given group.
    Flag(FlagGroup, String),
    /// Preprocessor definition such as `NAME` or `NAME=value`.
    Define(String),
    /// Header search directory.
    IncludePath(String),
    /// System or external library linked by name.
    Library(String),
}

impl Display for Attribute {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(group, flag) => write!(f, "{} flag '{flag}'", group.variable()),
            Self::Define(define) => write!(f, "define '{define}'"),
            Self::IncludePath(path) => write!(f, "include path '{path}'"),
            Self::Library(lib) => write!(f, "library '{lib}'"),
        }
    }
}

/// Insertion-ordered attributes owned by a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSet {
    entries: IndexSet<(Attribute, Visibility)>,
}

impl AttributeSet {
    /// Insert an entry, returning `false` if the exact entry already exists.
    pub fn insert(&mut self, attribute: Attribute, visibility: Visibility) -> bool {
        self.entries.insert((attribute, visibility))
    }

    /// Every entry in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&Attribute, Visibility)> {
        self.entries.iter().map(|(attr, vis)| (attr, *vis))
    }

    /// Attributes exported to dependents.
    pub fn public(&self) -> impl Iterator<Item = &Attribute> {
        self.iter()
            .filter(|(_, vis)| vis.is_public())
            .map(|(attr, _)| attr)
    }

    /// Flags of `group`, any visibility.
    pub fn flags(&self, group: FlagGroup) -> impl Iterator<Item = &str> {
        flags_of(self.iter().map(|(attr, _)| attr), group)
    }

    /// Preprocessor definitions, any visibility.
    pub fn defines(&self) -> impl Iterator<Item = &str> {
        defines_of(self.iter().map(|(attr, _)| attr))
    }

    /// Include paths, any visibility.
    pub fn include_paths(&self) -> impl Iterator<Item = &str> {
        include_paths_of(self.iter().map(|(attr, _)| attr))
    }

    /// Libraries, any visibility.
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        libraries_of(self.iter().map(|(attr, _)| attr))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flattened attributes visible to one target's edges.
///
/// Values are unique and keep the order in which they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveAttributes {
    attributes: IndexSet<Attribute>,
}

impl EffectiveAttributes {
    pub(crate) fn extend<'a>(&mut self, attributes: impl IntoIterator<Item = &'a Attribute>) {
        for attribute in attributes {
            if !self.attributes.contains(attribute) {
                self.attributes.insert(attribute.clone());
            }
        }
    }

    /// Whether `attribute` is visible.
    #[must_use]
    pub fn contains(&self, attribute: &Attribute) -> bool {
        self.attributes.contains(attribute)
    }

    /// Every visible attribute in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Flags of `group`.
    pub fn flags(&self, group: FlagGroup) -> impl Iterator<Item = &str> {
        flags_of(self.attributes.iter(), group)
    }

    /// Preprocessor definitions.
    pub fn defines(&self) -> impl Iterator<Item = &str> {
        defines_of(self.attributes.iter())
    }

    /// Include paths.
    pub fn include_paths(&self) -> impl Iterator<Item = &str> {
        include_paths_of(self.attributes.iter())
    }

    /// Linked libraries.
    pub fn libraries(&self) -> impl Iterator<Item = &str> {
        libraries_of(self.attributes.iter())
    }
}

fn flags_of<'a>(
    attrs: impl Iterator<Item = &'a Attribute>,
    wanted: FlagGroup,
) -> impl Iterator<Item = &'a str> {
    attrs.filter_map(move |attr| match attr {
        Attribute::Flag(group, flag) if *group == wanted => Some(flag.as_str()),
        _ => None,
    })
}

fn defines_of<'a>(attrs: impl Iterator<Item = &'a Attribute>) -> impl Iterator<Item = &'a str> {
    attrs.filter_map(|attr| match attr {
        Attribute::Define(define) => Some(define.as_str()),
        _ => None,
    })
}

fn include_paths_of<'a>(
    attrs: impl Iterator<Item = &'a Attribute>,
) -> impl Iterator<Item = &'a str> {
    attrs.filter_map(|attr| match attr {
        Attribute::IncludePath(path) => Some(path.as_str()),
        _ => None,
    })
}

fn libraries_of<'a>(attrs: impl Iterator<Item = &'a Attribute>) -> impl Iterator<Item = &'a str> {
    attrs.filter_map(|attr| match attr {
        Attribute::Library(lib) => Some(lib.as_str()),
        _ => None,
    })
}
