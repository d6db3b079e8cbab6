//! Dataset generators and the registry that names them.
//!
//! A generator maps a [`GeneratorRequest`] to a [`Dataset`]. Synthetic
//! generators are pure functions of the request; external generators
//! download, parse, and snapshot real-world data through the shared
//! [`DataContext`].

mod external;
mod parse;
mod sampling;
mod synthetic;

use std::{collections::HashMap, fmt, path::Path, str::FromStr, sync::Arc};

use crate::{
    dataset::Dataset,
    error::{BenchdataError, Result},
    fetch::Fetcher,
    snapshot::SnapshotCache,
};

/// Names of the built-in datasets.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DatasetName {
    /// Isotropic Gaussian clusters.
    Blobs,
    /// All-zero features and labels.
    Zeros,
    /// Gaussian classes placed on hypercube vertices.
    Classification,
    /// Linear regression targets over Gaussian features.
    Regression,
    /// Bosch production line numeric features (Kaggle).
    Bosch,
    /// Forest cover types (UCI).
    Covtype,
    /// Epsilon binary classification (LIBSVM).
    Epsilon,
    /// Higgs boson signal detection (UCI).
    Higgs,
    /// Million Song year prediction (UCI).
    Year,
}

impl DatasetName {
    /// Every built-in dataset, in registry order.
    pub const ALL: [Self; 9] = [
        Self::Blobs,
        Self::Zeros,
        Self::Classification,
        Self::Regression,
        Self::Bosch,
        Self::Covtype,
        Self::Epsilon,
        Self::Higgs,
        Self::Year,
    ];

    /// Registry name of the dataset.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blobs => "blobs",
            Self::Zeros => "zeros",
            Self::Classification => "classification",
            Self::Regression => "regression",
            Self::Bosch => "bosch",
            Self::Covtype => "covtype",
            Self::Epsilon => "epsilon",
            Self::Higgs => "higgs",
            Self::Year => "year",
        }
    }

    /// Whether the dataset is downloaded rather than synthesised.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(
            self,
            Self::Bosch | Self::Covtype | Self::Epsilon | Self::Higgs | Self::Year
        )
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatasetName {
    type Err = BenchdataError;

    fn from_str(raw: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str() == raw)
            .ok_or_else(|| BenchdataError::UnknownDataset {
                name: raw.to_owned(),
            })
    }
}

/// Generator-specific keyword parameters.
///
/// Each generator accepts a subset; supplying a parameter the generator does
/// not understand is an error rather than being silently ignored.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct GeneratorParams {
    /// Number of clusters for `blobs`.
    pub centers: Option<usize>,
    /// Number of classes for `classification`.
    pub n_classes: Option<usize>,
}

impl GeneratorParams {
    pub(crate) fn check_accepted(self, dataset: DatasetName, accepted: &[&str]) -> Result<()> {
        let supplied = [
            ("centers", self.centers.is_some()),
            ("n_classes", self.n_classes.is_some()),
        ];
        for (parameter, present) in supplied {
            if present && !accepted.contains(&parameter) {
                return Err(BenchdataError::InvalidParameter {
                    parameter,
                    message: format!("not accepted by the `{dataset}` generator"),
                });
            }
        }
        Ok(())
    }
}

/// Shape and seed handed to a generator.
///
/// Zero sizes ask the generator for its default.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct GeneratorRequest {
    /// Number of rows, or 0 for the generator default.
    pub n_samples: usize,
    /// Number of features, or 0 for the generator default.
    pub n_features: usize,
    /// Seed for synthetic generators; ignored by external datasets.
    pub random_state: u64,
    /// Generator-specific parameters.
    pub params: GeneratorParams,
}

/// Produces a [`Dataset`] for a request.
///
/// Closures with the matching signature implement this trait, which makes it
/// easy to substitute instrumented generators in tests.
pub trait Generator: Send + Sync {
    /// Generates or loads the dataset described by `request`.
    ///
    /// # Errors
    /// Returns any error raised while synthesising, downloading, parsing, or
    /// cropping the data.
    fn generate(&self, request: &GeneratorRequest, context: &DataContext) -> Result<Dataset>;
}

impl<F> Generator for F
where
    F: Fn(&GeneratorRequest, &DataContext) -> Result<Dataset> + Send + Sync,
{
    fn generate(&self, request: &GeneratorRequest, context: &DataContext) -> Result<Dataset> {
        self(request, context)
    }
}

/// Download locations for the external datasets.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatasetSources {
    /// Gzipped covertype CSV.
    pub covtype: String,
    /// Epsilon training file in SVMlight format.
    pub epsilon_train: String,
    /// Epsilon test file in SVMlight format.
    pub epsilon_test: String,
    /// Zipped year prediction CSV.
    pub year: String,
    /// Gzipped Higgs CSV.
    pub higgs: String,
    /// Kaggle competition hosting the Bosch data.
    pub bosch_competition: String,
    /// File fetched from the Bosch competition.
    pub bosch_file: String,
}

impl Default for DatasetSources {
    fn default() -> Self {
        Self {
            covtype: "https://archive.ics.uci.edu/ml/machine-learning-databases/covtype/covtype.data.gz"
                .to_owned(),
            epsilon_train:
                "https://www.csie.ntu.edu.tw/~cjlin/libsvmtools/datasets/binary/epsilon_normalized.bz2"
                    .to_owned(),
            epsilon_test:
                "https://www.csie.ntu.edu.tw/~cjlin/libsvmtools/datasets/binary/epsilon_normalized.t.bz2"
                    .to_owned(),
            year: "https://archive.ics.uci.edu/ml/machine-learning-databases/00203/YearPredictionMSD.txt.zip"
                .to_owned(),
            higgs: "https://archive.ics.uci.edu/ml/machine-learning-databases/00280/HIGGS.csv.gz"
                .to_owned(),
            bosch_competition: "bosch-production-line-performance".to_owned(),
            bosch_file: "train_numeric.csv.zip".to_owned(),
        }
    }
}

/// Shared services available to generators.
#[derive(Clone, Debug)]
pub struct DataContext {
    fetcher: Fetcher,
    snapshots: SnapshotCache,
    sources: DatasetSources,
}

impl DataContext {
    /// Bundles a fetcher, a snapshot cache, and dataset locations.
    #[must_use]
    pub const fn new(fetcher: Fetcher, snapshots: SnapshotCache, sources: DatasetSources) -> Self {
        Self {
            fetcher,
            snapshots,
            sources,
        }
    }

    /// Builds a context whose fetcher and snapshots share `cache_dir`.
    #[must_use]
    pub fn in_dir(cache_dir: &Path, sources: DatasetSources) -> Self {
        Self::new(
            Fetcher::new(cache_dir),
            SnapshotCache::new(cache_dir),
            sources,
        )
    }

    /// Remote file fetcher.
    #[must_use]
    pub const fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Parsed dataset snapshots.
    #[must_use]
    pub const fn snapshots(&self) -> &SnapshotCache {
        &self.snapshots
    }

    /// External dataset locations.
    #[must_use]
    pub const fn sources(&self) -> &DatasetSources {
        &self.sources
    }
}

/// Name-keyed table of generators.
///
/// # Examples
/// ```
/// use benchdata_core::{DatasetName, GeneratorRegistry};
///
/// let registry = GeneratorRegistry::default();
/// assert_eq!(registry.all_datasets().len(), 9);
/// assert!(registry.get(DatasetName::Zeros).is_ok());
/// ```
#[derive(Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<DatasetName, Arc<dyn Generator>>,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        let builtins: [(DatasetName, Arc<dyn Generator>); 9] = [
            (DatasetName::Blobs, Arc::new(synthetic::blobs)),
            (DatasetName::Zeros, Arc::new(synthetic::zeros)),
            (
                DatasetName::Classification,
                Arc::new(synthetic::classification),
            ),
            (DatasetName::Regression, Arc::new(synthetic::regression)),
            (DatasetName::Bosch, Arc::new(external::bosch)),
            (DatasetName::Covtype, Arc::new(external::covtype)),
            (DatasetName::Epsilon, Arc::new(external::epsilon)),
            (DatasetName::Higgs, Arc::new(external::higgs)),
            (DatasetName::Year, Arc::new(external::year)),
        ];
        Self {
            generators: builtins.into_iter().collect(),
        }
    }
}

impl GeneratorRegistry {
    /// Creates a registry holding every built-in generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the generator registered under `name`.
    #[must_use]
    pub fn with_generator(mut self, name: DatasetName, generator: Arc<dyn Generator>) -> Self {
        self.generators.insert(name, generator);
        self
    }

    /// Looks up the generator registered under `name`.
    ///
    /// # Errors
    /// Returns [`BenchdataError::UnknownDataset`] when nothing is registered.
    pub fn get(&self, name: DatasetName) -> Result<&dyn Generator> {
        self.generators
            .get(&name)
            .map(AsRef::as_ref)
            .ok_or_else(|| BenchdataError::UnknownDataset {
                name: name.as_str().to_owned(),
            })
    }

    /// Registered dataset names, in registry order.
    #[must_use]
    pub fn all_datasets(&self) -> Vec<DatasetName> {
        DatasetName::ALL
            .into_iter()
            .filter(|name| self.generators.contains_key(name))
            .collect()
    }
}

impl fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorRegistry")
            .field("datasets", &self.all_datasets())
            .finish()
    }
}

#[cfg(test)]
mod tests;
