use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::ball::Acb;
use crate::characteristic::Char;
use crate::matrix::{AcbMat, IntMat};
use crate::naive::naive_all;
use crate::siegel::char_transform::{det_at_i, sqrt_gaussian};
use crate::siegel::{
    automorphy, automorphy_sqr, char_transform, is_symplectic, kappa_word, siegel_transform_z,
    sqrt_cocycle, transform_kappa, zeta8_pow, Generator, Transform,
};

fn random_generator<R: Rng>(g: usize, rng: &mut R) -> Generator {
    match rng.gen_range(0..3) {
        0 => {
            // unit upper triangular, optionally with a sign flip
            let mut rows = vec![vec![0i64; g]; g];
            for i in 0..g {
                rows[i][i] = 1;
                for j in i + 1..g {
                    rows[i][j] = rng.gen_range(-2..=2);
                }
            }
            if rng.gen_bool(0.5) {
                rows[0].iter_mut().for_each(|x| *x = -*x);
            }
            Generator::block_diag(IntMat::from_i64_rows(&rows).unwrap()).unwrap()
        }
        1 => {
            let mut rows = vec![vec![0i64; g]; g];
            for i in 0..g {
                for j in i..g {
                    let x = rng.gen_range(-2..=2);
                    rows[i][j] = x;
                    rows[j][i] = x;
                }
            }
            Generator::Trig(IntMat::from_i64_rows(&rows).unwrap())
        }
        _ => {
            if rng.gen_bool(0.5) {
                Generator::EmbedJ
            } else {
                Generator::EmbedJInv
            }
        }
    }
}

fn random_transform<R: Rng>(g: usize, len: usize, rng: &mut R) -> Transform {
    let mut t = Transform::identity(g);
    for _ in 0..len {
        t.push_left(random_generator(g, rng)).unwrap();
    }
    t
}

#[test]
fn test_kappa_matches_phase_of_word() {
    super::init_tracing();
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    for g in 1..=2 {
        let len = if g == 1 { 3 } else { 2 };
        for _ in 0..6 {
            let t = random_transform(g, len, &mut rng);
            assert!(is_symplectic(t.mat()));
            let kappa = transform_kappa(t.mat()).unwrap();
            let (_, word) = kappa_word(&t, Char(0)).unwrap();
            assert_eq!(kappa.rem_euclid(4), word.rem_euclid(4), "{:?}", t.word());

            // both phases describe the same value once the roots agree
            let prec = 64;
            let iid = AcbMat::from_fn(g, g, |r, c| if r == c { Acb::i() } else { Acb::zero() });
            let (re, im) = det_at_i(t.mat(), g, prec).unwrap();
            let calibrated = zeta8_pow(kappa, prec).mul(&sqrt_gaussian(&re, &im, prec), prec);
            let along_word = zeta8_pow(word, prec)
                .mul(&sqrt_cocycle(&t, &iid, prec).unwrap(), prec);
            assert!(calibrated.overlaps(&along_word), "{:?}", t.word());
        }
    }
}

#[test]
fn test_phases_cancel_through_inverse() {
    let mut rng = ChaCha20Rng::seed_from_u64(34);
    let prec = 128;
    for g in 1..=3 {
        let tau = AcbMat::random_siegel(g, &mut rng);
        let z: Vec<Acb> = (0..g).map(|j| Acb::from_f64(0.1 * (j + 1) as f64, -0.05)).collect();
        for _ in 0..4 {
            let t = random_transform(g, 4, &mut rng);
            let inv = t.inverse().unwrap();
            let (z1, tau1) = siegel_transform_z(t.mat(), &z, &tau, prec).unwrap();
            let forward = automorphy(&t, &z, &tau, prec).unwrap();
            let backward = automorphy(&inv, &z1, &tau1, prec).unwrap();
            for m in Char::all(g) {
                let (image, k1) = kappa_word(&t, m).unwrap();
                let (back, k2) = kappa_word(&inv, image).unwrap();
                assert_eq!(back, m);
                let product = zeta8_pow(k1 + k2, prec)
                    .mul(&forward, prec)
                    .mul(&backward, prec);
                assert!(product.overlaps(&Acb::one()), "{:?}, m = {:?}", t.word(), m);
                assert!(product.rel_accuracy_bits() > 40);
            }
        }
    }
}

#[test]
fn test_round_trip_through_inverse() {
    let mut rng = ChaCha20Rng::seed_from_u64(21);
    let g = 2;
    let prec = 128;
    let tau = AcbMat::random_siegel(g, &mut rng);
    let z = vec![Acb::from_f64(0.1, 0.2), Acb::from_f64(-0.3, 0.05)];
    for _ in 0..4 {
        let t = random_transform(g, 4, &mut rng);
        let inv = t.inverse().unwrap();
        assert!(t.mat().mul(inv.mat()).unwrap().is_identity());
        let (z1, tau1) = siegel_transform_z(t.mat(), &z, &tau, prec).unwrap();
        let (z2, tau2) = siegel_transform_z(inv.mat(), &z1, &tau1, prec).unwrap();
        assert!(tau2.overlaps(&tau));
        for (x, y) in z2.iter().zip(&z) {
            assert!(x.overlaps(y));
        }
        for ab in Char::all(g) {
            let there = char_transform(t.mat(), ab).unwrap();
            assert_eq!(char_transform(inv.mat(), there).unwrap(), ab);
        }
    }
}

/// `θ²[M∘m](M·z, M·τ) = i^{k(M, m)}·det(Cτ + D)·exp(2πi zᵗ(Cτ + D)⁻¹Cz)·θ²[m](z, τ)`
/// checked by direct summation on both sides.
#[test]
fn test_squared_transformation_law() {
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let g = 2;
    let prec = 64;
    let tau = AcbMat::from_c64_rows(&[
        vec![(0.1, 1.1), (0.2, 0.1)],
        vec![(0.2, 0.1), (-0.2, 0.9)],
    ])
    .unwrap();
    let z = vec![Acb::from_f64(0.1, 0.05), Acb::from_f64(-0.05, 0.1)];
    for _ in 0..3 {
        let t = random_transform(g, 2, &mut rng);
        let (z1, tau1) = siegel_transform_z(t.mat(), &z, &tau, prec).unwrap();
        let before = naive_all(&[z.clone()], &tau, prec).unwrap();
        let after = naive_all(&[z1], &tau1, prec).unwrap();
        let factor = automorphy_sqr(t.mat(), &z, &tau, prec).unwrap();
        for m in Char::all(g) {
            let image = char_transform(t.mat(), m).unwrap();
            let (_, k) = kappa_word(&t, m).unwrap();
            let rhs = before[m.0 as usize].sqr(prec).mul(&factor, prec).mul_i_pow(k);
            let lhs = after[image.0 as usize].sqr(prec);
            assert!(lhs.overlaps(&rhs), "{:?}, m = {:?}", t.word(), m);
        }
    }
}

/// `θ[M∘m](M·z, M·τ) = ζ8^{κ(M, m)}·sqrt(det(Cτ + D))·exp(πi zᵗ(Cτ + D)⁻¹Cz)·θ[m](z, τ)`
/// with the root taken along the word.
#[test]
fn test_transformation_law() {
    let mut rng = ChaCha20Rng::seed_from_u64(13);
    let prec = 64;
    for g in 1..=2 {
        let tau = AcbMat::random_siegel(g, &mut rng);
        let z: Vec<Acb> = (0..g).map(|j| Acb::from_f64(0.05, 0.1 - 0.07 * j as f64)).collect();
        let before = naive_all(&[z.clone()], &tau, prec).unwrap();
        for _ in 0..3 {
            let t = random_transform(g, 2, &mut rng);
            let (z1, tau1) = siegel_transform_z(t.mat(), &z, &tau, prec).unwrap();
            let after = naive_all(&[z1], &tau1, prec).unwrap();
            let factor = automorphy(&t, &z, &tau, prec).unwrap();
            for m in Char::all(g) {
                let (image, k) = kappa_word(&t, m).unwrap();
                let rhs = before[m.0 as usize]
                    .mul(&factor, prec)
                    .mul(&zeta8_pow(k, prec), prec);
                assert!(
                    after[image.0 as usize].overlaps(&rhs),
                    "{:?}, m = {:?}",
                    t.word(),
                    m
                );
            }
        }
    }
}
