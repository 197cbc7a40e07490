use std::fmt;

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosReliability {
    #[default]
    Reliable,
    BestEffort,
}

impl fmt::Display for QosReliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reliable => write!(f, "Reliable"),
            Self::BestEffort => write!(f, "Best Effort"),
        }
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosHistory {
    KeepLast(usize),
    KeepAll,
}

impl Default for QosHistory {
    fn default() -> Self {
        // The depth every endpoint of the template node registers with.
        Self::KeepLast(10)
    }
}

impl QosHistory {
    /// Queue capacity implied by this history setting.
    pub fn depth(&self) -> usize {
        match self {
            Self::KeepLast(depth) => *depth,
            Self::KeepAll => usize::MAX,
        }
    }
}

impl fmt::Display for QosHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::KeepLast(depth) => write!(f, "Keep Last ({})", depth),
            Self::KeepAll => write!(f, "Keep All"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub enum QosDurability {
    TransientLocal,
    #[default]
    Volatile,
}

impl fmt::Display for QosDurability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransientLocal => write!(f, "Transient Local"),
            Self::Volatile => write!(f, "Volatile"),
        }
    }
}

#[derive(Debug, Default, Hash, PartialEq, Eq, Clone, Copy)]
pub struct QosProfile {
    pub reliability: QosReliability,
    pub durability: QosDurability,
    pub history: QosHistory,
}

impl QosProfile {
    pub fn keep_last(depth: usize) -> Self {
        Self {
            history: QosHistory::KeepLast(depth),
            ..Default::default()
        }
    }

    /// Compact string form carried in the liveliness key expression:
    /// `<reliability>:<durability>:<history_kind>,<depth>`.
    pub fn encode(&self) -> String {
        let reliability = match self.reliability {
            QosReliability::Reliable => "1",
            QosReliability::BestEffort => "2",
        };
        let durability = match self.durability {
            QosDurability::TransientLocal => "1",
            QosDurability::Volatile => "2",
        };
        let history = match self.history {
            QosHistory::KeepLast(depth) => format!("1,{}", depth),
            QosHistory::KeepAll => "2,".to_string(),
        };
        format!("{reliability}:{durability}:{history}")
    }
}

impl fmt::Display for QosProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "QoS({}, {}, {})",
            self.reliability, self.durability, self.history
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_default() {
        assert_eq!(QosProfile::default().encode(), "1:2:1,10");
    }

    #[test]
    fn encode_keep_all() {
        let qos = QosProfile {
            reliability: QosReliability::BestEffort,
            durability: QosDurability::TransientLocal,
            history: QosHistory::KeepAll,
        };
        assert_eq!(qos.encode(), "2:1:2,");
    }

    #[test]
    fn history_depth() {
        assert_eq!(QosHistory::KeepLast(3).depth(), 3);
        assert_eq!(QosHistory::KeepAll.depth(), usize::MAX);
    }
}
