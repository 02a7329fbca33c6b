//! Dataset package
//!
//! Registry of the dataset loader modules shipped with the runtime. The
//! package re-exports its submodules and has no public API of its own.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::debug;

use crate::config::Config;
use crate::error::TensorError;

/// Names exported by the package itself
pub const PUBLIC_API: &[&str] = &[];

/// Dataset submodules, in re-export order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetModule {
    Mnist,
    Imikolov,
    Imdb,
    Cifar,
    Movielens,
    Conll05,
    UciHousing,
    Wmt14,
    Wmt16,
    Flowers,
    Voc2012,
    Image,
}

impl DatasetModule {
    pub const ALL: [DatasetModule; 12] = [
        DatasetModule::Mnist,
        DatasetModule::Imikolov,
        DatasetModule::Imdb,
        DatasetModule::Cifar,
        DatasetModule::Movielens,
        DatasetModule::Conll05,
        DatasetModule::UciHousing,
        DatasetModule::Wmt14,
        DatasetModule::Wmt16,
        DatasetModule::Flowers,
        DatasetModule::Voc2012,
        DatasetModule::Image,
    ];

    /// Module name as it appears in the package
    pub fn name(&self) -> &'static str {
        match self {
            DatasetModule::Mnist => "mnist",
            DatasetModule::Imikolov => "imikolov",
            DatasetModule::Imdb => "imdb",
            DatasetModule::Cifar => "cifar",
            DatasetModule::Movielens => "movielens",
            DatasetModule::Conll05 => "conll05",
            DatasetModule::UciHousing => "uci_housing",
            DatasetModule::Wmt14 => "wmt14",
            DatasetModule::Wmt16 => "wmt16",
            DatasetModule::Flowers => "flowers",
            DatasetModule::Voc2012 => "voc2012",
            DatasetModule::Image => "image",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DatasetModule::Mnist => "MNIST handwritten digits",
            DatasetModule::Imikolov => "PTB language modeling corpus (Mikolov)",
            DatasetModule::Imdb => "IMDB movie review sentiment",
            DatasetModule::Cifar => "CIFAR-10 and CIFAR-100 images",
            DatasetModule::Movielens => "MovieLens 1M ratings",
            DatasetModule::Conll05 => "CoNLL-2005 semantic role labeling",
            DatasetModule::UciHousing => "UCI Boston housing regression",
            DatasetModule::Wmt14 => "WMT14 English-French translation",
            DatasetModule::Wmt16 => "WMT16 English-German translation",
            DatasetModule::Flowers => "Oxford 102 flowers",
            DatasetModule::Voc2012 => "PASCAL VOC2012 segmentation",
            DatasetModule::Image => "image preprocessing helpers",
        }
    }

    /// Whether the module loads a dataset (`image` only provides helpers)
    pub fn is_loader(&self) -> bool {
        !matches!(self, DatasetModule::Image)
    }

    /// All modules that load a dataset
    pub fn loaders() -> impl Iterator<Item = DatasetModule> {
        Self::ALL.into_iter().filter(DatasetModule::is_loader)
    }

    /// Cache directory for this module under the configured data home
    pub fn cache_dir(&self, config: &Config) -> PathBuf {
        let dir = config.data_home.join(self.name());
        debug!(module = self.name(), dir = %dir.display(), "dataset cache dir");
        dir
    }
}

impl fmt::Display for DatasetModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetModule {
    type Err = TensorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| TensorError::UnknownDataset(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order() {
        let names: Vec<&str> = DatasetModule::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(
            names,
            vec![
                "mnist",
                "imikolov",
                "imdb",
                "cifar",
                "movielens",
                "conll05",
                "uci_housing",
                "wmt14",
                "wmt16",
                "flowers",
                "voc2012",
                "image"
            ]
        );
    }

    #[test]
    fn test_parse_round_trip() {
        for module in DatasetModule::ALL {
            assert_eq!(module.to_string().parse::<DatasetModule>().unwrap(), module);
        }
        assert_eq!("UCI_Housing".parse::<DatasetModule>().unwrap(), DatasetModule::UciHousing);
    }

    #[test]
    fn test_unknown_dataset() {
        assert_eq!(
            "coco".parse::<DatasetModule>().unwrap_err(),
            TensorError::UnknownDataset("coco".to_string())
        );
    }

    #[test]
    fn test_loaders_exclude_image() {
        let loaders: Vec<DatasetModule> = DatasetModule::loaders().collect();
        assert_eq!(loaders.len(), 11);
        assert!(!loaders.contains(&DatasetModule::Image));
        assert!(PUBLIC_API.is_empty());
    }

    #[test]
    fn test_cache_dir() {
        let mut config = Config::builtin();
        config.data_home = PathBuf::from("/data");
        assert_eq!(
            DatasetModule::Wmt16.cache_dir(&config),
            PathBuf::from("/data/wmt16")
        );
    }
}
