//! Source and receiver bookkeeping.
//!
//! A [`Survey`] is an ordered collection of unique [`Source`]s, each of which
//! holds an ordered collection of unique [`Receiver`]s. All items carry
//! explicit identifiers assigned at construction, which are used for the
//! uniqueness checks and index lookups.
//!
//! Receivers know where they measure and build the projection from a mesh to
//! their locations on demand. The projections are memoized per mesh unless
//! disabled with [`Receiver::with_store_projections`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use rand::Rng;
use rand_distr::StandardNormal;
use thiserror::Error;

use crate::core::ConfigurationError;
use crate::mesh::{GridLocation, Mesh, MeshError, MeshId};
use crate::simulation::Simulation;
use crate::sparse;

macro_rules! identifier {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            fn next() -> Self {
                static COUNTER: AtomicU64 = AtomicU64::new(0);
                $name(COUNTER.fetch_add(1, Ordering::Relaxed))
            }

            /// Numeric value of the identifier.
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier!(ReceiverId, "Identifier of a receiver.");
identifier!(SourceId, "Identifier of a source.");

/// Error of index lookups in sources and surveys.
///
/// Lookups are all-or-nothing, so the error lists every requested item that
/// was not found.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} not found: {missing:?}")]
pub struct LookupError {
    /// Kind of the items (receiver, source).
    pub kind: &'static str,
    /// Identifiers of the missing items.
    pub missing: Vec<u64>,
}

/// Error of survey operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurveyError {
    /// Invalid configuration.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),
    /// Failed index lookup.
    #[error("{0}")]
    Lookup(#[from] LookupError),
    /// Failed construction of a projection.
    #[error("{0}")]
    Mesh(#[from] MeshError),
    /// Predicting data on the survey is no longer supported.
    #[error("survey no longer has the dpred method, use simulation predict instead")]
    DeprecatedUsage,
}

/// Where on the time mesh the data are projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeLocation {
    /// Time nodes.
    Node,
    /// Centers of the time steps.
    CellCenter,
}

impl From<TimeLocation> for GridLocation {
    fn from(location: TimeLocation) -> Self {
        match location {
            TimeLocation::Node => GridLocation::Node,
            TimeLocation::CellCenter => GridLocation::CellCenter,
        }
    }
}

#[derive(Debug, Clone)]
struct TimeSampling {
    times: DVector<f64>,
    location: TimeLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ProjectionKey {
    mesh: MeshId,
    location: GridLocation,
    time_mesh: Option<MeshId>,
}

/// Receiver measuring at one or more locations.
#[derive(Debug)]
pub struct Receiver {
    id: ReceiverId,
    locations: DMatrix<f64>,
    projection_location: GridLocation,
    store_projections: bool,
    time: Option<TimeSampling>,
    projections: Mutex<HashMap<ProjectionKey, Arc<CsrMatrix<f64>>>>,
}

impl Receiver {
    /// Creates a receiver with locations given one per row.
    ///
    /// The projection location defaults to cell centers and projections are
    /// stored.
    pub fn new(locations: DMatrix<f64>) -> Result<Self, ConfigurationError> {
        if locations.nrows() == 0 || locations.ncols() == 0 {
            return Err(ConfigurationError::Missing("receiver locations"));
        }

        Ok(Self {
            id: ReceiverId::next(),
            locations,
            projection_location: GridLocation::CellCenter,
            store_projections: true,
            time: None,
            projections: Mutex::new(HashMap::new()),
        })
    }

    /// Creates a receiver at a single point.
    pub fn at(point: &[f64]) -> Result<Self, ConfigurationError> {
        Self::new(DMatrix::from_row_slice(1, point.len(), point))
    }

    /// Creates a time-domain receiver measuring at all `times` in every
    /// location.
    ///
    /// The time projection location defaults to time nodes.
    pub fn time_domain(locations: DMatrix<f64>, times: Vec<f64>) -> Result<Self, ConfigurationError> {
        if times.is_empty() {
            return Err(ConfigurationError::Missing("receiver times"));
        }

        let mut rx = Self::new(locations)?;
        rx.time = Some(TimeSampling {
            times: DVector::from_vec(times),
            location: TimeLocation::Node,
        });
        Ok(rx)
    }

    /// Sets the grid location the data are projected from.
    pub fn with_projection_location(mut self, location: GridLocation) -> Self {
        self.projection_location = location;
        self
    }

    /// Sets the time location the data are projected from. Has no effect on
    /// receivers that are not time-domain.
    pub fn with_time_location(mut self, location: TimeLocation) -> Self {
        if let Some(time) = &mut self.time {
            time.location = location;
        }
        self
    }

    /// Enables or disables memoization of the projections.
    pub fn with_store_projections(mut self, store: bool) -> Self {
        self.store_projections = store;
        self
    }

    /// Identifier of the receiver.
    pub fn id(&self) -> ReceiverId {
        self.id
    }

    /// Locations of the receiver, one per row.
    pub fn locations(&self) -> &DMatrix<f64> {
        &self.locations
    }

    /// Sampling times, if the receiver is time-domain.
    pub fn times(&self) -> Option<&DVector<f64>> {
        self.time.as_ref().map(|t| &t.times)
    }

    /// Grid location the data are projected from.
    pub fn projection_location(&self) -> GridLocation {
        self.projection_location
    }

    /// Number of data measured by the receiver.
    pub fn n_data(&self) -> usize {
        let n_times = self.time.as_ref().map(|t| t.times.len()).unwrap_or(1);
        self.locations.nrows() * n_times
    }

    /// Number of memoized projections.
    pub fn n_stored_projections(&self) -> usize {
        self.lock_projections().len()
    }

    /// Projection from values on the mesh to the receiver locations.
    ///
    /// Uses the receiver's projection location unless `location` is given.
    pub fn projection<M: Mesh + ?Sized>(
        &self,
        mesh: &M,
        location: Option<GridLocation>,
    ) -> Result<Arc<CsrMatrix<f64>>, MeshError> {
        let location = location.unwrap_or(self.projection_location);
        let key = ProjectionKey {
            mesh: mesh.id(),
            location,
            time_mesh: None,
        };

        self.memoized(key, || mesh.interpolation_matrix(&self.locations, location))
    }

    /// Space-time projection of a time-domain receiver, `kron(P_time,
    /// P_space)`.
    pub fn time_projection<M, T>(&self, mesh: &M, time_mesh: &T) -> Result<Arc<CsrMatrix<f64>>, SurveyError>
    where
        M: Mesh + ?Sized,
        T: Mesh + ?Sized,
    {
        let time = self
            .time
            .as_ref()
            .ok_or(ConfigurationError::Missing("receiver times"))?;

        let key = ProjectionKey {
            mesh: mesh.id(),
            location: self.projection_location,
            time_mesh: Some(time_mesh.id()),
        };

        let projection = self.memoized(key, || {
            let ps = mesh.interpolation_matrix(&self.locations, self.projection_location)?;
            let times = DMatrix::from_column_slice(time.times.len(), 1, time.times.as_slice());
            let pt = time_mesh.interpolation_matrix(&times, time.location.into())?;
            Ok(sparse::kron(&pt, &ps))
        })?;

        Ok(projection)
    }

    fn memoized<F>(&self, key: ProjectionKey, build: F) -> Result<Arc<CsrMatrix<f64>>, MeshError>
    where
        F: FnOnce() -> Result<CsrMatrix<f64>, MeshError>,
    {
        if let Some(p) = self.lock_projections().get(&key) {
            return Ok(Arc::clone(p));
        }

        // Built without holding the lock. A concurrent build of the same key
        // is wasted work but the first published matrix wins.
        debug!("building projection for receiver {} ({:?})", self.id, key);
        let built = Arc::new(build()?);

        if !self.store_projections {
            return Ok(built);
        }

        let mut projections = self.lock_projections();
        Ok(Arc::clone(projections.entry(key).or_insert(built)))
    }

    fn lock_projections(&self) -> std::sync::MutexGuard<'_, HashMap<ProjectionKey, Arc<CsrMatrix<f64>>>> {
        // The cache holds no invariants that a panic could break.
        self.projections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn check_unique<I>(kind: &'static str, ids: I) -> Result<HashMap<u64, usize>, ConfigurationError>
where
    I: IntoIterator<Item = u64>,
{
    let mut index = HashMap::new();

    for (i, id) in ids.into_iter().enumerate() {
        if index.insert(id, i).is_some() {
            return Err(ConfigurationError::Duplicate { kind, id });
        }
    }

    Ok(index)
}

fn lookup<I>(kind: &'static str, index: &HashMap<u64, usize>, ids: I) -> Result<Vec<usize>, LookupError>
where
    I: IntoIterator<Item = u64>,
{
    let mut found = Vec::new();
    let mut missing = Vec::new();

    for id in ids {
        match index.get(&id) {
            Some(&i) => found.push(i),
            None => missing.push(id),
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(LookupError { kind, missing })
    }
}

/// Source with its receivers.
#[derive(Debug, Clone)]
pub struct Source {
    id: SourceId,
    location: DVector<f64>,
    receivers: Vec<Arc<Receiver>>,
    index: HashMap<u64, usize>,
}

impl Source {
    /// Creates a source at given location. The receivers must be unique.
    pub fn new(location: Vec<f64>, receivers: Vec<Arc<Receiver>>) -> Result<Self, ConfigurationError> {
        let index = check_unique("receiver", receivers.iter().map(|rx| rx.id().get()))?;

        Ok(Self {
            id: SourceId::next(),
            location: DVector::from_vec(location),
            receivers,
            index,
        })
    }

    /// Replaces the receivers. The new receivers must be unique, otherwise the
    /// source is left unchanged.
    pub fn set_receivers(&mut self, receivers: Vec<Arc<Receiver>>) -> Result<(), ConfigurationError> {
        self.index = check_unique("receiver", receivers.iter().map(|rx| rx.id().get()))?;
        self.receivers = receivers;
        Ok(())
    }

    /// Identifier of the source.
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// Location of the source.
    pub fn location(&self) -> &DVector<f64> {
        &self.location
    }

    /// Receivers of the source.
    pub fn receivers(&self) -> &[Arc<Receiver>] {
        &self.receivers
    }

    /// Positions of given receivers in the receiver list.
    pub fn receiver_index(&self, receivers: &[ReceiverId]) -> Result<Vec<usize>, LookupError> {
        lookup("receiver", &self.index, receivers.iter().map(|id| id.get()))
    }

    /// Number of data of each receiver.
    pub fn vn_data(&self) -> Vec<usize> {
        self.receivers.iter().map(|rx| rx.n_data()).collect()
    }

    /// Total number of data of the source.
    pub fn n_data(&self) -> usize {
        self.vn_data().iter().sum()
    }
}

/// Observed data with their uncertainty model.
#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    dobs: DVector<f64>,
    clean: Option<DVector<f64>>,
    relative_std: f64,
    noise_floor: f64,
}

impl Data {
    /// Creates the data with given relative standard deviation.
    ///
    /// The noise floor defaults to `1e-5 * ||dobs||`.
    pub fn new(dobs: DVector<f64>, relative_std: f64) -> Result<Self, ConfigurationError> {
        if dobs.is_empty() {
            return Err(ConfigurationError::Missing("observed data"));
        }

        let relative_std = ConfigurationError::check_nonnegative("relative standard deviation", relative_std)?;
        let noise_floor = 1e-5 * dobs.norm();

        Ok(Self {
            dobs,
            clean: None,
            relative_std,
            noise_floor,
        })
    }

    /// Overrides the noise floor.
    pub fn with_noise_floor(mut self, floor: f64) -> Result<Self, ConfigurationError> {
        self.noise_floor = ConfigurationError::check_nonnegative("noise floor", floor)?;
        Ok(self)
    }

    /// Observed data.
    pub fn dobs(&self) -> &DVector<f64> {
        &self.dobs
    }

    /// Noise-free data, if the data are synthetic.
    pub fn clean(&self) -> Option<&DVector<f64>> {
        self.clean.as_ref()
    }

    /// Relative standard deviation.
    pub fn relative_std(&self) -> f64 {
        self.relative_std
    }

    /// Absolute noise floor.
    pub fn noise_floor(&self) -> f64 {
        self.noise_floor
    }

    /// Standard deviation of each datum, `relative_std * |dobs| + floor`.
    pub fn uncertainty(&self) -> DVector<f64> {
        self.dobs
            .map(|d| self.relative_std * d.abs() + self.noise_floor)
    }
}

/// Ordered collection of unique sources.
#[derive(Debug, Clone)]
pub struct Survey {
    sources: Vec<Source>,
    index: HashMap<u64, usize>,
    data: Option<Data>,
}

impl Survey {
    /// Creates a survey. The sources must be unique.
    pub fn new(sources: Vec<Source>) -> Result<Self, ConfigurationError> {
        let index = check_unique("source", sources.iter().map(|src| src.id().get()))?;

        Ok(Self {
            sources,
            index,
            data: None,
        })
    }

    /// Replaces the sources. The new sources must be unique, otherwise the
    /// survey is left unchanged.
    pub fn set_sources(&mut self, sources: Vec<Source>) -> Result<(), ConfigurationError> {
        self.index = check_unique("source", sources.iter().map(|src| src.id().get()))?;
        self.sources = sources;
        Ok(())
    }

    /// Sources of the survey.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    /// Number of sources.
    pub fn n_sources(&self) -> usize {
        self.sources.len()
    }

    /// Positions of given sources in the source list.
    pub fn source_index(&self, sources: &[SourceId]) -> Result<Vec<usize>, LookupError> {
        lookup("source", &self.index, sources.iter().map(|id| id.get()))
    }

    /// Number of data of each source.
    pub fn vn_data(&self) -> Vec<usize> {
        self.sources.iter().map(Source::n_data).collect()
    }

    /// Total number of data.
    pub fn n_data(&self) -> usize {
        self.vn_data().iter().sum()
    }

    /// Removed. Data are predicted by the simulation.
    pub fn dpred(&self, _m: &DVector<f64>) -> Result<DVector<f64>, SurveyError> {
        Err(SurveyError::DeprecatedUsage)
    }

    /// Data attached to the survey, if any.
    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    /// Attaches observed data to the survey.
    pub fn set_data(&mut self, data: Data) -> Result<(), ConfigurationError> {
        ConfigurationError::check_dim("observed data", self.n_data(), data.dobs.len())?;
        self.data = Some(data);
        Ok(())
    }

    /// Generates synthetic data by adding Gaussian noise with standard
    /// deviation `relative_std * |d|` to the simulated data `d` of the true
    /// model.
    ///
    /// If the survey already has data, they are returned unchanged unless
    /// `force` is set.
    pub fn make_synthetic_data<S, R>(
        &mut self,
        simulation: &S,
        m_true: &DVector<f64>,
        relative_std: f64,
        force: bool,
        rng: &mut R,
    ) -> Result<&Data, SurveyError>
    where
        S: Simulation + ?Sized,
        R: Rng,
    {
        if self.data.is_some() && !force {
            debug!("synthetic data already exist, use force to regenerate");
        } else {
            ConfigurationError::check_nonnegative("relative standard deviation", relative_std)?;
            ConfigurationError::check_dim("simulated data", self.n_data(), simulation.n_data())?;
            ConfigurationError::check_dim("true model", simulation.n_params(), m_true.len())?;

            let clean = simulation.predict(m_true);
            let dobs = clean.map(|d| {
                let noise: f64 = rng.sample(StandardNormal);
                d + relative_std * d.abs() * noise
            });

            let mut data = Data::new(dobs, relative_std)?;
            data.clean = Some(clean);
            self.data = Some(data);
        }

        self.data
            .as_ref()
            .ok_or(SurveyError::Configuration(ConfigurationError::Missing("observed data")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{dmatrix, dvector};
    use rand::{rngs::StdRng, SeedableRng};

    use crate::mesh::TensorMesh;
    use crate::testing::toy_simulation;

    fn receiver(n: usize) -> Arc<Receiver> {
        Arc::new(Receiver::new(DMatrix::from_fn(n, 2, |i, j| 0.1 * (i + j) as f64)).unwrap())
    }

    #[test]
    fn duplicate_receivers_rejected() {
        let rx = receiver(2);
        let result = Source::new(vec![0.0, 0.0], vec![Arc::clone(&rx), receiver(1), rx.clone()]);

        assert_eq!(
            result.unwrap_err(),
            ConfigurationError::Duplicate {
                kind: "receiver",
                id: rx.id().get()
            }
        );
    }

    #[test]
    fn duplicate_sources_rejected() {
        let src = Source::new(vec![0.0], vec![receiver(1)]).unwrap();
        assert!(matches!(
            Survey::new(vec![src.clone(), src]),
            Err(ConfigurationError::Duplicate { kind: "source", .. })
        ));
    }

    #[test]
    fn failed_reassignment_keeps_receivers() {
        let rx = receiver(1);
        let mut src = Source::new(vec![0.0], vec![rx.clone()]).unwrap();

        assert!(src.set_receivers(vec![rx.clone(), rx.clone()]).is_err());
        assert_eq!(src.receivers().len(), 1);
        assert_eq!(src.receiver_index(&[rx.id()]), Ok(vec![0]));
    }

    #[test]
    fn index_lookup_is_all_or_nothing() {
        let sources: Vec<_> = (0..3)
            .map(|_| Source::new(vec![0.0], vec![receiver(2)]).unwrap())
            .collect();
        let ids: Vec<_> = sources.iter().map(Source::id).collect();
        let survey = Survey::new(sources).unwrap();

        assert_eq!(survey.source_index(&[ids[2], ids[0]]), Ok(vec![2, 0]));

        let stranger = Source::new(vec![0.0], vec![receiver(1)]).unwrap();
        let err = survey.source_index(&[ids[1], stranger.id()]).unwrap_err();
        assert_eq!(err.missing, vec![stranger.id().get()]);

        let rx = receiver(1);
        let err = survey.sources()[0].receiver_index(&[rx.id()]).unwrap_err();
        assert_eq!(err.kind, "receiver");
    }

    #[test]
    fn number_of_data() {
        let time_rx = Arc::new(Receiver::time_domain(dmatrix![0.5, 0.5; 0.2, 0.3], vec![0.0, 1.0, 2.0]).unwrap());
        let src_a = Source::new(vec![0.0, 0.0], vec![receiver(3), time_rx]).unwrap();
        let src_b = Source::new(vec![1.0, 0.0], vec![receiver(4)]).unwrap();
        let survey = Survey::new(vec![src_a, src_b]).unwrap();

        assert_eq!(survey.vn_data(), vec![3 + 2 * 3, 4]);
        assert_eq!(survey.n_data(), 13);
        assert_eq!(survey.n_sources(), 2);
    }

    #[test]
    fn single_point_receiver() {
        let rx = Receiver::at(&[0.1, 0.2, 0.3]).unwrap();
        assert_eq!(rx.locations().shape(), (1, 3));
        assert!(Receiver::at(&[]).is_err());
        assert!(Receiver::time_domain(dmatrix![0.0], vec![]).is_err());
    }

    #[test]
    fn projections_are_memoized_per_mesh_and_location() {
        let mesh = TensorMesh::uniform(&[4, 4], &[1.0, 1.0]).unwrap();
        let other = TensorMesh::uniform(&[4, 4], &[1.0, 1.0]).unwrap();
        let rx = Receiver::new(dmatrix![0.3, 0.6; 0.5, 0.5]).unwrap();

        let p1 = rx.projection(&mesh, None).unwrap();
        let p2 = rx.projection(&mesh, None).unwrap();
        assert!(Arc::ptr_eq(&p1, &p2));
        assert_eq!(rx.n_stored_projections(), 1);

        rx.projection(&mesh, Some(GridLocation::Node)).unwrap();
        rx.projection(&other, None).unwrap();
        assert_eq!(rx.n_stored_projections(), 3);

        assert!(rx.projection(&mesh, Some(GridLocation::Edge)).is_err());
        assert_eq!(rx.n_stored_projections(), 3);
    }

    #[test]
    fn projections_not_stored_when_disabled() {
        let mesh = TensorMesh::uniform(&[4], &[1.0]).unwrap();
        let rx = Receiver::new(dmatrix![0.3; 0.6])
            .unwrap()
            .with_store_projections(false);

        let p1 = rx.projection(&mesh, None).unwrap();
        let p2 = rx.projection(&mesh, None).unwrap();
        assert!(!Arc::ptr_eq(&p1, &p2));
        assert_eq!(rx.n_stored_projections(), 0);
    }

    #[test]
    fn time_projection_is_kronecker_product() {
        let mesh = TensorMesh::uniform(&[4], &[1.0]).unwrap();
        let time_mesh = TensorMesh::uniform(&[2], &[2.0]).unwrap();
        let rx = Receiver::time_domain(dmatrix![0.3; 0.6], vec![0.0, 0.5, 2.0]).unwrap();

        let p = rx.time_projection(&mesh, &time_mesh).unwrap();
        assert_eq!(p.nrows(), rx.n_data());
        assert_eq!(p.ncols(), 4 * 3);

        // Field u(x, t) = x + 10 t on cell centers of space and nodes of time.
        let xs = mesh.centers_along(0);
        let ts = time_mesh.nodes_along(0);
        let u = DVector::from_iterator(12, ts.iter().flat_map(|&t| xs.iter().map(move |&x| x + 10.0 * t)));
        let values = &*p * &u;

        assert_abs_diff_eq!(
            values,
            dvector![0.3, 0.6, 5.3, 5.6, 20.3, 20.6],
            epsilon = 1e-12
        );

        let spatial = Receiver::new(dmatrix![0.3]).unwrap();
        assert!(matches!(
            spatial.time_projection(&mesh, &time_mesh),
            Err(SurveyError::Configuration(ConfigurationError::Missing(_)))
        ));
    }

    #[test]
    fn dpred_is_deprecated() {
        let survey = Survey::new(vec![]).unwrap();
        assert_eq!(
            survey.dpred(&DVector::zeros(1)),
            Err(SurveyError::DeprecatedUsage)
        );
    }

    #[test]
    fn synthetic_data_cached_unless_forced() {
        let (sim, survey) = toy_simulation();
        let mut survey = survey;
        let mut rng = StdRng::seed_from_u64(3);
        let m = dvector![0.4, 0.6];

        let first = survey.make_synthetic_data(&sim, &m, 0.05, false, &mut rng).unwrap().clone();
        let again = survey.make_synthetic_data(&sim, &m, 0.05, false, &mut rng).unwrap().clone();
        assert_eq!(first, again);

        let forced = survey.make_synthetic_data(&sim, &m, 0.05, true, &mut rng).unwrap();
        assert_ne!(forced.dobs(), first.dobs());
        assert_eq!(forced.clean(), first.clean());

        let noiseless = survey.make_synthetic_data(&sim, &m, 0.0, true, &mut rng).unwrap();
        assert_eq!(Some(noiseless.dobs()), noiseless.clean());
    }

    #[test]
    fn uncertainty_model() {
        let data = Data::new(dvector![3.0, -4.0], 0.1).unwrap();
        assert_abs_diff_eq!(data.noise_floor(), 5e-5);
        assert_abs_diff_eq!(data.uncertainty(), dvector![0.30005, 0.40005], epsilon = 1e-12);

        let data = data.with_noise_floor(1.0).unwrap();
        assert_abs_diff_eq!(data.uncertainty(), dvector![1.3, 1.4], epsilon = 1e-12);
        assert!(Data::new(dvector![1.0], -0.1).is_err());
        assert!(Data::new(DVector::zeros(0), 0.1).is_err());
    }
}
