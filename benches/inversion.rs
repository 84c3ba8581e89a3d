use std::rc::Rc;

use criterion::{criterion_group, criterion_main, Criterion};
use geoinv::{
    composite::Composite,
    constraint::{GradientSign, Volume},
    data_misfit::L2DataMisfit,
    driver::{Inversion, InversionOptions},
    mesh::{Mesh, TensorMesh},
    nalgebra::DVector,
    nalgebra_sparse::{CooMatrix, CsrMatrix},
    regularization::Tikhonov,
    simulation::{LinearSimulation, Simulation},
    survey::Data,
    Domain, Objective,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const N: usize = 20;
const N_DATA: usize = 60;
const NNZ_PER_ROW: usize = 30;

fn random_operator(n_cells: usize, rng: &mut StdRng) -> CsrMatrix<f64> {
    let mut coo = CooMatrix::new(N_DATA, n_cells);

    for row in 0..N_DATA {
        for _ in 0..NNZ_PER_ROW {
            coo.push(row, rng.gen_range(0..n_cells), rng.gen_range(0.0..0.1));
        }
    }

    CsrMatrix::from(&coo)
}

fn setup() -> (TensorMesh, L2DataMisfit<LinearSimulation>, DVector<f64>) {
    let mesh = TensorMesh::uniform(&[N, N], &[1.0, 1.0]).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let sim = LinearSimulation::new(random_operator(mesh.n_cells(), &mut rng));

    let m_true = DVector::from_fn(mesh.n_cells(), |i, _| if i % 7 == 0 { 0.8 } else { 0.1 });
    let data = Data::new(sim.predict(&m_true), 0.03).unwrap();
    let dmis = L2DataMisfit::new(sim, &data).unwrap();

    (mesh, dmis, m_true)
}

fn tikhonov(c: &mut Criterion) {
    let (mesh, _, m) = setup();
    let reg = Tikhonov::new(&mesh);

    c.bench_function("tikhonov hessian product", |b| {
        b.iter(|| reg.hessian_product(&m, &m))
    });
}

fn projected_gncg(c: &mut Criterion) {
    let (mesh, dmis, m_true) = setup();
    let dmis = Rc::new(dmis);
    let n = mesh.n_cells();
    let reg = Tikhonov::new(&mesh);
    let volume = Volume::on_mesh(&mesh, 0.0).unwrap();
    let known = volume.estimated_volume(&m_true);
    let volume = Volume::on_mesh(&mesh, known)
        .unwrap()
        .with_gradient_sign(GradientSign::Derivative);

    let mut options = InversionOptions::default();
    options.set_max_iter(4).set_beta(1e-2);

    c.bench_function("projected gncg 4 iterations", |b| {
        b.iter(|| {
            let mut inversion = Inversion::builder(&dmis, &reg)
                .with_options(options.clone())
                .with_domain(Domain::uniform(n, 0.0, 1.0).unwrap())
                .build()
                .unwrap();
            inversion.run(DVector::zeros(n)).unwrap()
        })
    });

    let phi = Composite::shared(dmis.clone()) + 1e3 * Composite::leaf(volume);

    c.bench_function("projected gncg with volume 4 iterations", |b| {
        b.iter(|| {
            let mut inversion = Inversion::builder(&phi, &reg)
                .with_options(options.clone())
                .with_domain(Domain::uniform(n, 0.0, 1.0).unwrap())
                .build()
                .unwrap();
            inversion.run(DVector::zeros(n)).unwrap()
        })
    });
}

criterion_group!(inversion, tikhonov, projected_gncg);
criterion_main!(inversion);
