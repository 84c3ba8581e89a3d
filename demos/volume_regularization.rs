//! Straight ray tomography with a volume constraint.
//!
//! A block with porosity 0.8 sits in a unit square of background porosity 0.
//! Sources on the left edge and receivers on the right edge record travel
//! times along straight rays. The model is recovered twice, with and without
//! a penalty on the deviation of the model volume from the true volume.

use std::error::Error;
use std::rc::Rc;
use std::sync::Arc;

use geoinv::algo::{ProjectedGncg, ProjectedGncgOptions};
use geoinv::composite::Composite;
use geoinv::constraint::{GradientSign, Volume};
use geoinv::data_misfit::L2DataMisfit;
use geoinv::driver::{Inversion, InversionOptions};
use geoinv::mesh::{Mesh, TensorMesh};
use geoinv::nalgebra::{DMatrix, DVector};
use geoinv::nalgebra_sparse::{CooMatrix, CsrMatrix};
use geoinv::regularization::Tikhonov;
use geoinv::simulation::LinearSimulation;
use geoinv::survey::{Receiver, Source, Survey};
use geoinv::{Domain, Objective};
use rand::{rngs::StdRng, SeedableRng};

const N_CELLS: usize = 40;
const N_RAYS: usize = 10;
const SAMPLES_PER_RAY: usize = 400;
const BETA: f64 = 4e-2;
const VOLUME_MULTIPLIER: f64 = 6e5;

fn cell_index(nodes: &[f64], p: f64) -> usize {
    nodes
        .partition_point(|&node| node <= p)
        .saturating_sub(1)
        .min(nodes.len() - 2)
}

/// Travel time operator. The length of each ray is split into equal
/// segments attributed to the cell containing the segment midpoint.
fn straight_ray_operator(mesh: &TensorMesh, survey: &Survey) -> CsrMatrix<f64> {
    let xs = mesh.nodes_along(0);
    let ys = mesh.nodes_along(1);
    let nx = xs.len() - 1;

    let mut coo = CooMatrix::new(survey.n_data(), mesh.n_cells());
    let mut row = 0;

    for src in survey.sources() {
        let a = src.location();

        for rx in src.receivers() {
            for b in rx.locations().row_iter() {
                let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
                let ds = (dx * dx + dy * dy).sqrt() / SAMPLES_PER_RAY as f64;

                for k in 0..SAMPLES_PER_RAY {
                    let t = (k as f64 + 0.5) / SAMPLES_PER_RAY as f64;
                    let i = cell_index(&xs, a[0] + t * dx);
                    let j = cell_index(&ys, a[1] + t * dy);
                    coo.push(row, i + nx * j, ds);
                }

                row += 1;
            }
        }
    }

    CsrMatrix::from(&coo)
}

fn invert<D: Objective>(phi: &D, reg: &Tikhonov, n: usize) -> Result<DVector<f64>, Box<dyn Error>> {
    let mut gncg = ProjectedGncgOptions::default();
    gncg.set_remember(4);

    let mut options = InversionOptions::default();
    options.set_max_iter(4).set_beta(BETA);

    let mut inversion = Inversion::builder(phi, reg)
        .with_options(options)
        .with_domain(Domain::uniform(n, 0.0, 1.0)?)
        .with_algo(|dom| ProjectedGncg::with_options(dom, gncg))
        .build()?;

    let result = inversion.run(DVector::from_element(n, 1e-16))?;

    println!(
        "{} after {} iterations, phi_d = {:.3e}, phi_m = {:.3e}, {} models remembered",
        result.termination,
        result.iterations,
        result.phi_d,
        result.phi_m,
        inversion.algo().history().len()
    );

    Ok(result.model)
}

fn main() -> Result<(), Box<dyn Error>> {
    let mesh = TensorMesh::uniform(&[N_CELLS, N_CELLS], &[1.0, 1.0])?;
    let n = mesh.n_cells();
    let cx = mesh.centers_along(0);
    let cy = mesh.centers_along(1);

    let (first, last) = (cy[0], cx[N_CELLS - 1]);
    let heights: Vec<f64> = (0..N_RAYS)
        .map(|k| first + (last - first) * k as f64 / (N_RAYS - 1) as f64)
        .collect();

    let locations = DMatrix::from_fn(N_RAYS, 2, |k, axis| if axis == 0 { last } else { heights[k] });
    let rx = Arc::new(Receiver::new(locations)?);
    let sources = heights
        .iter()
        .map(|&y| Source::new(vec![cx[0], y], vec![Arc::clone(&rx)]))
        .collect::<Result<Vec<_>, _>>()?;
    let mut survey = Survey::new(sources)?;

    let centers = mesh.cell_centers();
    let phi_true = DVector::from_fn(n, |cell, _| {
        let (x, y) = (centers[(cell, 0)], centers[(cell, 1)]);
        if (0.4..=0.6).contains(&x) && (0.4..=0.6).contains(&y) {
            0.8
        } else {
            0.0
        }
    });

    let volume = Volume::on_mesh(&mesh, 0.0)?;
    let known = volume.estimated_volume(&phi_true);
    let volume = Volume::on_mesh(&mesh, known)?.with_gradient_sign(GradientSign::Derivative);
    println!("true volume: {:.4e}", known);

    let simulation = LinearSimulation::new(straight_ray_operator(&mesh, &survey));
    let mut rng = StdRng::seed_from_u64(2014);
    let data = survey
        .make_synthetic_data(&simulation, &phi_true, 0.03, true, &mut rng)?
        .clone();

    let dmis = Rc::new(L2DataMisfit::new(simulation, &data)?);
    let reg = Tikhonov::new(&mesh);

    let without = invert(&*dmis, &reg, n)?;
    println!(
        "recovered volume without the volume term: {:.4e}",
        volume.estimated_volume(&without)
    );

    let phi = Composite::shared(dmis) + VOLUME_MULTIPLIER * Composite::leaf(volume.clone());
    let with = invert(&phi, &reg, n)?;
    println!(
        "recovered volume with the volume term: {:.4e}",
        volume.estimated_volume(&with)
    );

    Ok(())
}
