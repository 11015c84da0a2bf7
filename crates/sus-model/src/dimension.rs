//! Output dimension names shared by the converters.

/// Prefix marking an output column as a numeric field.
pub const FIELD_PREFIX: &str = "*field_";

/// Normalized date column written by every converter.
pub const DATE_COLUMN: &str = "date";

/// Prefix of cleaned dimension columns in `locations.csv` files.
pub const CLEAN_PREFIX: &str = "Clean";

/// Prefix of raw dimension columns in `locations.csv` files.
pub const RAW_PREFIX: &str = "Raw";

/// Build the output name of a field column.
pub fn field_name(id: &str) -> String {
    format!("{FIELD_PREFIX}{id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Region,
    State,
    HealthRegion,
    Municipality,
    AgeGroup,
    Gender,
    Race,
    Dead,
    ComorbiditiesAndRiskFactors,
    FinalClassificationOfCase,
    Hospitalization,
    Age,
    MothersAge,
    Schooling,
    MothersSchooling,
    PregnancyType,
    PregnancyKind,
    PlaceOfDeath,
    MomentOfChildbirth,
    GestationalPhase,
    GestationWeeks,
    MedicalCare,
    IsAutopsy,
    IsWorkRelated,
    ViolentDeathType,
    InfoSource,
    DeathType,
    NumberLivingChildren,
    NumberDeceasedChildren,
    CausesTitle,
    CausesParent,
    CausesCategory1,
    CausesCategory2,
    CausesCategory3,
    CausesCategory4,
    OccupationTitle,
    OccupationFamily,
    OccupationSubgroup,
    OccupationPrincipalSubgroup,
    OccupationGroup,
    MothersOccupationTitle,
    MothersOccupationFamily,
    MothersOccupationSubgroup,
    MothersOccupationPrincipalSubgroup,
    MothersOccupationGroup,
}

/// Geography from least to most specific.
pub const HIERARCHICAL_DIMENSIONS: [Dimension; 4] = [
    Dimension::Region,
    Dimension::State,
    Dimension::HealthRegion,
    Dimension::Municipality,
];

impl Dimension {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Region => "RegionName",
            Self::State => "StateName",
            Self::HealthRegion => "HealthRegionName",
            Self::Municipality => "MunicipalityName",
            Self::AgeGroup => "AgeGroup",
            Self::Gender => "Gender",
            Self::Race => "Race",
            Self::Dead => "Dead",
            Self::ComorbiditiesAndRiskFactors => "ComorbiditiesAndRiskFactors",
            Self::FinalClassificationOfCase => "FinalClassificationOfCase",
            Self::Hospitalization => "Hospitalization",
            Self::Age => "Age",
            Self::MothersAge => "MothersAge",
            Self::Schooling => "Schooling",
            Self::MothersSchooling => "MothersSchooling",
            Self::PregnancyType => "PregnancyType",
            Self::PregnancyKind => "PregnancyKind",
            Self::PlaceOfDeath => "PlaceOfDeath",
            Self::MomentOfChildbirth => "MomentOfChildbirth",
            Self::GestationalPhase => "GestationalPhase",
            Self::GestationWeeks => "GestationWeeks",
            Self::MedicalCare => "MedicalCare",
            Self::IsAutopsy => "IsAutopsy",
            Self::IsWorkRelated => "IsWorkRelated",
            Self::ViolentDeathType => "ViolentDeathType",
            Self::InfoSource => "InfoSource",
            Self::DeathType => "DeathType",
            Self::NumberLivingChildren => "NumberLivingChildren",
            Self::NumberDeceasedChildren => "NumberDeceasedChildren",
            Self::CausesTitle => "CausesOfDeathTitle",
            Self::CausesParent => "CausesOfDeathParent",
            Self::CausesCategory1 => "CausesOfDeathCategory1",
            Self::CausesCategory2 => "CausesOfDeathCategory2",
            Self::CausesCategory3 => "CausesOfDeathCategory3",
            Self::CausesCategory4 => "CausesOfDeathCategory4",
            Self::OccupationTitle => "OccupationTitle",
            Self::OccupationFamily => "OccupationFamily",
            Self::OccupationSubgroup => "OccupationSubgroup",
            Self::OccupationPrincipalSubgroup => "OccupationPrincipalSubgroup",
            Self::OccupationGroup => "OccupationGroup",
            Self::MothersOccupationTitle => "MothersOccupationTitle",
            Self::MothersOccupationFamily => "MothersOccupationFamily",
            Self::MothersOccupationSubgroup => "MothersOccupationSubgroup",
            Self::MothersOccupationPrincipalSubgroup => "MothersOccupationPrincipalSubgroup",
            Self::MothersOccupationGroup => "MothersOccupationGroup",
        }
    }

    /// Name of the cleaned column for this dimension (`CleanStateName`).
    pub fn clean_column(self) -> String {
        format!("{CLEAN_PREFIX}{}", self.as_str())
    }

    /// Name of the raw column for this dimension (`RawStateName`).
    pub fn raw_column(self) -> String {
        format!("{RAW_PREFIX}{}", self.as_str())
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
