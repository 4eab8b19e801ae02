use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic tier of the property ("zone fiscale").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ZoneFiscale {
    #[serde(rename = "A bis", alias = "Abis")]
    ABis,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "B1")]
    B1,
    #[serde(rename = "B2")]
    B2,
    #[serde(rename = "C")]
    C,
}

impl ZoneFiscale {
    pub const ALL: [ZoneFiscale; 5] = [Self::ABis, Self::A, Self::B1, Self::B2, Self::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ABis => "A bis",
            Self::A => "A",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::C => "C",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A bis" | "Abis" | "A_BIS" => Some(Self::ABis),
            "A" => Some(Self::A),
            "B1" => Some(Self::B1),
            "B2" => Some(Self::B2),
            "C" => Some(Self::C),
            _ => None,
        }
    }
}

impl fmt::Display for ZoneFiscale {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rent cap tier the investor commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NiveauLoyer {
    #[default]
    Intermediaire,
    Social,
    TresSocial,
}

impl NiveauLoyer {
    pub const ALL: [NiveauLoyer; 3] = [Self::Intermediaire, Self::Social, Self::TresSocial];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intermediaire => "intermediaire",
            Self::Social => "social",
            Self::TresSocial => "tres-social",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "intermediaire" => Some(Self::Intermediaire),
            "social" => Some(Self::Social),
            "tres-social" => Some(Self::TresSocial),
            _ => None,
        }
    }
}

impl fmt::Display for NiveauLoyer {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Furnished rental category, which drives the Micro-BIC allowance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RentalCategory {
    #[default]
    LongueDuree,
    TourismeNonClasse,
    ChambresHotes,
}

impl RentalCategory {
    pub const ALL: [RentalCategory; 3] =
        [Self::LongueDuree, Self::TourismeNonClasse, Self::ChambresHotes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LongueDuree => "longue-duree",
            Self::TourismeNonClasse => "tourisme-non-classe",
            Self::ChambresHotes => "chambres-hotes",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "longue-duree" => Some(Self::LongueDuree),
            "tourisme-non-classe" => Some(Self::TourismeNonClasse),
            "chambres-hotes" => Some(Self::ChambresHotes),
            _ => None,
        }
    }
}

impl fmt::Display for RentalCategory {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// LMNP tax regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LmnpRegime {
    MicroBic,
    Reel,
}

impl LmnpRegime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MicroBic => "micro-bic",
            Self::Reel => "reel",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "micro-bic" => Some(Self::MicroBic),
            "reel" => Some(Self::Reel),
            _ => None,
        }
    }
}

impl fmt::Display for LmnpRegime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Legal holding structure. Carried through the simulation unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LegalStructure {
    #[default]
    NomPropre,
    SciIr,
    SciIs,
}

impl LegalStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NomPropre => "nom-propre",
            Self::SciIr => "sci-ir",
            Self::SciIs => "sci-is",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "nom-propre" => Some(Self::NomPropre),
            "sci-ir" => Some(Self::SciIr),
            "sci-is" => Some(Self::SciIs),
            _ => None,
        }
    }

    /// Whether the structure is taxed as a company rather than a household.
    pub fn is_corporate(&self) -> bool {
        matches!(self, Self::SciIs)
    }
}

/// Household situation, used to derive the number of parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamilySituation {
    #[default]
    Celibataire,
    Couple,
}

impl FamilySituation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celibataire => "celibataire",
            Self::Couple => "couple",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "celibataire" => Some(Self::Celibataire),
            "couple" => Some(Self::Couple),
            _ => None,
        }
    }
}
