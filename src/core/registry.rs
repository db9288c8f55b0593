use crate::app::generators::{DemulGenerator, MesenGenerator};
use crate::domain::ports::Generator;
use crate::utils::error::{LauncherError, Result};

type Factory = Box<dyn Fn() -> Box<dyn Generator> + Send + Sync>;

/// Emulators whose `<family>-<variant>` names share one generator.
const FAMILIES: [&str; 1] = ["demul"];

/// 模擬器名稱 -> generator
///
/// Variants such as `demul-old` or `demul-naomi` resolve to their family
/// (`demul`) when they have no entry of their own. Other names must match
/// exactly.
pub struct GeneratorRegistry {
    entries: Vec<(String, Factory)>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("demul", || Box::new(DemulGenerator::new()));
        registry.register("mesen", || Box::new(MesenGenerator::new()));
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn Generator> + Send + Sync + 'static,
    {
        let name = name.to_ascii_lowercase();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, Box::new(factory)));
    }

    fn find(&self, name: &str) -> Option<&Factory> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, factory)| factory)
    }

    pub fn create(&self, emulator: &str) -> Result<Box<dyn Generator>> {
        let name = emulator.trim().to_ascii_lowercase();
        let family = name
            .split_once('-')
            .map(|(family, _)| family)
            .filter(|family| FAMILIES.contains(family));

        self.find(&name)
            .or_else(|| family.and_then(|family| self.find(family)))
            .map(|factory| factory())
            .ok_or_else(|| LauncherError::UnknownEmulator {
                name: emulator.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
