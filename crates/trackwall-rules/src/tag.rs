//! Rule element tags

use trackwall_components::ComponentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleTag {
    Activity,
    Service,
    Broadcast,
}

impl RuleTag {
    /// Rule element for a component kind. Providers have none.
    pub fn for_kind(kind: ComponentKind) -> Option<Self> {
        match kind {
            ComponentKind::Activity => Some(RuleTag::Activity),
            ComponentKind::Service => Some(RuleTag::Service),
            ComponentKind::Receiver => Some(RuleTag::Broadcast),
            ComponentKind::Provider => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTag::Activity => "activity",
            RuleTag::Service => "service",
            RuleTag::Broadcast => "broadcast",
        }
    }
}

impl std::fmt::Display for RuleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RuleTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" => Ok(RuleTag::Activity),
            "service" => Ok(RuleTag::Service),
            "broadcast" => Ok(RuleTag::Broadcast),
            _ => Err(format!("Unknown rule tag: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(RuleTag::for_kind(ComponentKind::Activity), Some(RuleTag::Activity));
        assert_eq!(RuleTag::for_kind(ComponentKind::Service), Some(RuleTag::Service));
        assert_eq!(RuleTag::for_kind(ComponentKind::Receiver), Some(RuleTag::Broadcast));
        assert_eq!(RuleTag::for_kind(ComponentKind::Provider), None);
    }

    #[test]
    fn test_tag_names_are_case_sensitive() {
        assert_eq!("broadcast".parse::<RuleTag>().unwrap(), RuleTag::Broadcast);
        assert!("Activity".parse::<RuleTag>().is_err());
        assert!("receiver".parse::<RuleTag>().is_err());
    }
}
