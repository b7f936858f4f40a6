//! Elemental infusion engine.
//!
//! Six element slots, each either inert, strong, or waning. Infusing an
//! element makes it strong; at the end of every round each slot decays one
//! step (strong → waning → inert). Consuming an element resets it to inert.
//!
//! [`ElementalInfusion`] is a `Copy` value and every mutator takes `self`
//! and returns the new state, so there is no way to mutate a board's
//! elements in place from two call sites.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RulesError;

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// One of the six fixed infusion elements.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Fire,
    Ice,
    Air,
    Earth,
    Light,
    Dark,
}

impl Element {
    /// Every element, in slot order.
    pub const ALL: [Element; 6] = [
        Element::Fire,
        Element::Ice,
        Element::Air,
        Element::Earth,
        Element::Light,
        Element::Dark,
    ];

    /// The wire key for this element.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Ice => "ice",
            Self::Air => "air",
            Self::Earth => "earth",
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single validation gate for element keys coming from clients.
///
/// Keys are matched exactly; anything outside the fixed six is a
/// [`RulesError::Validation`].
impl FromStr for Element {
    type Err = RulesError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Element::ALL
            .into_iter()
            .find(|element| element.as_str() == key)
            .ok_or_else(|| {
                RulesError::Validation(format!("unknown element '{key}'"))
            })
    }
}

// ---------------------------------------------------------------------------
// Potency
// ---------------------------------------------------------------------------

/// How charged an element slot is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Potency {
    #[default]
    Inert,
    Strong,
    Waning,
}

impl Potency {
    /// The potency one round later.
    pub fn decayed(self) -> Self {
        match self {
            Self::Strong => Self::Waning,
            Self::Waning | Self::Inert => Self::Inert,
        }
    }

    /// Strong and waning elements can be consumed.
    pub fn is_charged(self) -> bool {
        !matches!(self, Self::Inert)
    }
}

// ---------------------------------------------------------------------------
// ElementalInfusion
// ---------------------------------------------------------------------------

/// Total mapping from the six elements to their potency.
///
/// Backed by a fixed array indexed by [`Element`], so a missing or extra
/// key is unrepresentable. On the wire it is a JSON object with exactly the
/// six lowercase keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<Element, Potency>",
    try_from = "BTreeMap<Element, Potency>"
)]
pub struct ElementalInfusion {
    slots: [Potency; 6],
}

impl ElementalInfusion {
    /// All six elements inert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Infuses `element`: it becomes strong, whatever it was before.
    #[must_use]
    pub fn generate(mut self, element: Element) -> Self {
        self.slots[element.slot()] = Potency::Strong;
        self
    }

    /// Consumes `element`: it becomes inert. Consuming an inert element is
    /// a no-op, not an error.
    #[must_use]
    pub fn consume(mut self, element: Element) -> Self {
        self.slots[element.slot()] = Potency::Inert;
        self
    }

    /// End-of-round decay, applied to every slot independently.
    #[must_use]
    pub fn decay(mut self) -> Self {
        for slot in &mut self.slots {
            *slot = slot.decayed();
        }
        self
    }

    /// Returns `true` if `element` is strong or waning.
    pub fn can_consume(&self, element: Element) -> bool {
        self.potency(element).is_charged()
    }

    pub fn potency(&self, element: Element) -> Potency {
        self.slots[element.slot()]
    }

    /// Iterates `(element, potency)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Element, Potency)> + '_ {
        Element::ALL.into_iter().map(|element| (element, self.potency(element)))
    }

    /// Returns `true` when nothing is left to decay.
    pub fn is_all_inert(&self) -> bool {
        self.slots.iter().all(|slot| !slot.is_charged())
    }
}

impl From<ElementalInfusion> for BTreeMap<Element, Potency> {
    fn from(infusion: ElementalInfusion) -> Self {
        infusion.iter().collect()
    }
}

impl TryFrom<BTreeMap<Element, Potency>> for ElementalInfusion {
    type Error = RulesError;

    fn try_from(map: BTreeMap<Element, Potency>) -> Result<Self, Self::Error> {
        let mut infusion = Self::new();
        for element in Element::ALL {
            let potency = map.get(&element).copied().ok_or_else(|| {
                RulesError::Invariant(format!(
                    "element map is missing '{element}'"
                ))
            })?;
            infusion.slots[element.slot()] = potency;
        }
        Ok(infusion)
    }
}
