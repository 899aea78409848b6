//! Domain Registry - the fixed set of topic domains inventions are filed under

use serde::Serialize;

/// Display metadata for a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DomainInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub color: &'static str,
}

const DOMAINS: &[(&str, DomainInfo)] = &[
    (
        "mechanical-engineering",
        DomainInfo {
            name: "Mechanical Engineering",
            description: "Fasteners, joints, mechanisms, and mechanical systems",
            icon: "⚙️",
            color: "#3498db",
        },
    ),
    (
        "materials-science",
        DomainInfo {
            name: "Materials Science",
            description: "Alloys, composites, polymers, and novel materials",
            icon: "🔬",
            color: "#9b59b6",
        },
    ),
    (
        "chemical-engineering",
        DomainInfo {
            name: "Chemical Engineering",
            description: "Synthesis methods, catalysts, and chemical processes",
            icon: "🧪",
            color: "#e74c3c",
        },
    ),
    (
        "pharmaceutical-chemistry",
        DomainInfo {
            name: "Pharmaceutical Chemistry",
            description: "Drug compounds, formulations, and delivery systems",
            icon: "💊",
            color: "#1abc9c",
        },
    ),
    (
        "electrical-engineering",
        DomainInfo {
            name: "Electrical Engineering",
            description: "Circuit designs, power systems, and electronic devices",
            icon: "⚡",
            color: "#f39c12",
        },
    ),
    (
        "software-algorithms",
        DomainInfo {
            name: "Software Algorithms",
            description: "Data structures, optimization methods, and algorithms",
            icon: "💻",
            color: "#34495e",
        },
    ),
    (
        "biotechnology",
        DomainInfo {
            name: "Biotechnology",
            description: "Genetic constructs, protein engineering, and biotech",
            icon: "🧬",
            color: "#16a085",
        },
    ),
    (
        "environmental-technology",
        DomainInfo {
            name: "Environmental Technology",
            description: "Filtration, remediation, recycling, and green tech",
            icon: "🌱",
            color: "#27ae60",
        },
    ),
    (
        "medical-devices",
        DomainInfo {
            name: "Medical Devices",
            description: "Diagnostic tools, surgical instruments, and devices",
            icon: "🏥",
            color: "#e67e22",
        },
    ),
    (
        "agricultural-technology",
        DomainInfo {
            name: "Agricultural Technology",
            description: "Crop systems, pest management, and agtech",
            icon: "🌾",
            color: "#d35400",
        },
    ),
];

/// Static, immutable lookup of domains in declaration order
#[derive(Debug, Clone, Copy)]
pub struct DomainRegistry {
    entries: &'static [(&'static str, DomainInfo)],
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl DomainRegistry {
    /// The built-in domain table
    pub fn builtin() -> Self {
        Self { entries: DOMAINS }
    }

    /// Build a registry over a caller-supplied table
    pub fn from_static(entries: &'static [(&'static str, DomainInfo)]) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&'static DomainInfo> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, info)| info)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn list_all(&self) -> impl Iterator<Item = (&'static str, &'static DomainInfo)> {
        self.entries.iter().map(|(k, info)| (*k, info))
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.entries.iter().map(|(k, _)| *k).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup() {
        let registry = DomainRegistry::builtin();
        let info = registry.get("materials-science").unwrap();
        assert_eq!(info.name, "Materials Science");
        assert_eq!(info.color, "#9b59b6");
        assert!(registry.get("alchemy").is_none());
    }

    #[test]
    fn test_keys_are_unique() {
        let registry = DomainRegistry::builtin();
        let keys: HashSet<_> = registry.keys().into_iter().collect();
        assert_eq!(keys.len(), registry.len());
        assert_eq!(registry.len(), 10);
    }
}
