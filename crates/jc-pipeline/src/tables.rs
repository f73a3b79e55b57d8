//! Per-bin settings tuned on the PbPb dataset, kept as data.
//!
//! Method and veto rows are `[asymmetry, centrality, track_pt, value]`; bins
//! without a row use the table default. The asymmetry index 3 is the
//! imbalance-integrated bin of the nominal binning.

/// Seagull method, leading and inclusive categories, PbPb data.
#[rustfmt::skip]
pub(crate) const PBPB_LEADING_METHOD: &[[usize; 4]] = &[
    [3, 0, 0, 6], [3, 0, 1, 6], [3, 0, 2, 5], [3, 0, 3, 1], [3, 0, 4, 1], [3, 1, 0, 6],
    [3, 1, 1, 6], [3, 1, 2, 5], [3, 1, 3, 5], [3, 1, 4, 1], [3, 2, 0, 1], [3, 2, 1, 1],
    [3, 2, 2, 1], [0, 0, 0, 1], [0, 0, 1, 1], [0, 0, 2, 1], [0, 0, 3, 4], [0, 0, 4, 6],
    [0, 1, 0, 1], [0, 1, 1, 1], [0, 1, 2, 1], [0, 1, 3, 1], [0, 1, 4, 6], [0, 2, 0, 6],
    [0, 2, 1, 6], [1, 0, 0, 1], [1, 0, 1, 6], [1, 0, 2, 6], [1, 0, 3, 1], [1, 1, 0, 1],
    [1, 1, 1, 5], [1, 1, 2, 1], [1, 1, 3, 1], [1, 2, 1, 1], [2, 0, 1, 6], [2, 0, 2, 6],
    [2, 1, 1, 6], [2, 1, 2, 6], [2, 2, 1, 1],
];

/// Seagull method, subleading categories, PbPb data.
#[rustfmt::skip]
pub(crate) const PBPB_SUBLEADING_METHOD: &[[usize; 4]] = &[
    [3, 0, 0, 1], [3, 0, 1, 1], [3, 0, 2, 6], [3, 1, 0, 6], [3, 1, 1, 6], [3, 1, 2, 5],
    [3, 2, 0, 1], [0, 0, 1, 6], [1, 0, 0, 1], [1, 0, 1, 1], [1, 0, 2, 5], [1, 1, 1, 6],
    [1, 2, 0, 1], [2, 0, 1, 5], [2, 1, 1, 6], [2, 2, 0, 5], [2, 3, 0, 6],
];

/// Seagull method, leading and inclusive categories, PbPb simulation.
#[rustfmt::skip]
pub(crate) const PBPB_MC_LEADING_METHOD: &[[usize; 4]] = &[
    [3, 0, 0, 6], [3, 0, 1, 6], [3, 0, 2, 6], [3, 0, 3, 6], [3, 0, 4, 6], [3, 1, 0, 6],
    [3, 1, 1, 6], [3, 1, 2, 6], [3, 1, 3, 6], [3, 1, 4, 6], [3, 2, 0, 6], [3, 2, 1, 6],
    [3, 2, 2, 6], [3, 2, 3, 6], [3, 2, 4, 6], [3, 3, 0, 6], [3, 3, 1, 6], [3, 3, 2, 6],
    [3, 3, 3, 6], [0, 0, 1, 5], [0, 0, 2, 6], [0, 0, 3, 6], [0, 0, 4, 6], [0, 1, 0, 6],
    [0, 1, 1, 6], [0, 1, 2, 6], [0, 1, 3, 6], [0, 1, 4, 6], [0, 2, 1, 6], [0, 2, 2, 6],
    [0, 2, 3, 6], [1, 0, 0, 6], [1, 0, 1, 6], [1, 0, 2, 6], [1, 0, 3, 6], [1, 0, 4, 6],
    [1, 1, 0, 6], [1, 1, 1, 6], [1, 1, 2, 6], [1, 1, 3, 6], [1, 1, 4, 6], [1, 2, 0, 6],
    [1, 2, 1, 6], [1, 2, 2, 6], [1, 2, 3, 6], [1, 2, 4, 6], [1, 3, 1, 6], [2, 0, 0, 6],
    [2, 0, 1, 6], [2, 0, 2, 6], [2, 0, 3, 6], [2, 0, 4, 6], [2, 1, 0, 6], [2, 1, 1, 6],
    [2, 1, 2, 6], [2, 1, 3, 6], [2, 2, 0, 6], [2, 2, 1, 6], [2, 2, 2, 6],
];

/// Seagull veto (1 force, 2 skip), leading and inclusive categories, PbPb data.
#[rustfmt::skip]
pub(crate) const PBPB_LEADING_VETO: &[[usize; 4]] = &[
    [3, 0, 5, 2], [3, 0, 6, 2], [3, 1, 5, 2], [3, 1, 6, 2], [3, 2, 5, 2], [3, 2, 6, 2],
    [3, 3, 5, 2], [3, 3, 6, 2], [0, 0, 5, 2], [0, 0, 6, 2], [0, 1, 5, 2], [0, 1, 6, 2],
    [0, 2, 0, 1], [0, 2, 2, 2], [0, 2, 4, 2], [0, 2, 5, 2], [0, 2, 6, 2], [0, 3, 0, 2],
    [0, 3, 1, 2], [0, 3, 2, 2], [0, 3, 3, 1], [0, 3, 4, 2], [0, 3, 5, 2], [0, 3, 6, 2],
    [1, 0, 4, 2], [1, 0, 5, 2], [1, 0, 6, 2], [1, 1, 4, 2], [1, 1, 5, 2], [1, 1, 6, 2],
    [1, 2, 4, 2], [1, 2, 5, 2], [1, 2, 6, 2], [1, 3, 5, 2], [1, 3, 6, 2], [2, 0, 5, 2],
    [2, 0, 6, 2], [2, 1, 5, 2], [2, 1, 6, 2], [2, 2, 5, 2], [2, 2, 6, 2], [2, 3, 4, 2],
    [2, 3, 5, 2], [2, 3, 6, 2],
];

/// Seagull veto (1 force, 2 skip), subleading categories, PbPb data.
#[rustfmt::skip]
pub(crate) const PBPB_SUBLEADING_VETO: &[[usize; 4]] = &[
    [3, 0, 5, 2], [3, 0, 6, 2], [3, 1, 5, 2], [3, 1, 6, 2], [3, 2, 5, 2], [3, 2, 6, 2],
    [3, 3, 5, 2], [3, 3, 6, 2], [0, 0, 5, 2], [0, 0, 6, 2], [0, 1, 5, 2], [0, 1, 6, 2],
    [0, 2, 3, 1], [0, 2, 4, 2], [0, 2, 5, 2], [0, 2, 6, 2], [0, 3, 1, 2], [0, 3, 2, 1],
    [0, 3, 5, 2], [0, 3, 6, 2], [1, 0, 0, 2], [1, 0, 1, 1], [1, 0, 2, 2], [1, 0, 5, 2],
    [1, 0, 6, 2], [1, 1, 3, 2], [1, 1, 5, 2], [1, 1, 6, 2], [1, 2, 1, 2], [1, 2, 3, 2],
    [1, 2, 5, 2], [1, 2, 6, 2], [1, 3, 3, 2], [1, 3, 4, 2], [1, 3, 5, 2], [1, 3, 6, 2],
    [2, 0, 5, 2], [2, 0, 6, 2], [2, 1, 0, 2], [2, 1, 3, 2], [2, 1, 4, 2], [2, 1, 5, 2],
    [2, 1, 6, 2], [2, 2, 0, 2], [2, 2, 3, 1], [2, 2, 4, 2], [2, 2, 5, 2], [2, 2, 6, 2],
    [2, 3, 0, 2], [2, 3, 4, 2], [2, 3, 5, 2], [2, 3, 6, 2],
];

/// Seagull veto (1 force, 2 skip), leading and inclusive categories, PbPb simulation.
#[rustfmt::skip]
pub(crate) const PBPB_MC_LEADING_VETO: &[[usize; 4]] = &[
    [3, 0, 5, 2], [3, 0, 6, 2], [3, 1, 5, 2], [3, 1, 6, 2], [3, 2, 3, 2], [3, 2, 4, 2],
    [3, 2, 5, 2], [3, 2, 6, 2], [3, 3, 5, 2], [3, 3, 6, 2], [0, 0, 5, 2], [0, 0, 6, 2],
    [0, 1, 5, 2], [0, 1, 6, 2], [0, 2, 5, 2], [0, 2, 6, 2], [0, 3, 5, 2], [0, 3, 6, 2],
    [1, 0, 5, 2], [1, 0, 6, 2], [1, 1, 5, 2], [1, 1, 6, 2], [1, 2, 5, 2], [1, 2, 6, 2],
    [1, 3, 5, 2], [1, 3, 6, 2], [2, 0, 5, 2], [2, 0, 6, 2], [2, 1, 5, 2], [2, 1, 6, 2],
    [2, 2, 5, 2], [2, 2, 6, 2], [2, 3, 5, 2], [2, 3, 6, 2],
];

/// Replacement radial-profile values for pT-weighted leading-jet profiles in PbPb:
/// `(asymmetry, centrality, track_pt, [(ΔR bin counted from 1, value)])`.
#[rustfmt::skip]
pub(crate) const PT_WEIGHTED_LEADING_CLEANING: &[(usize, usize, usize, &[(usize, f64)])] = &[
    (0, 0, 1, &[(11, 8.2853939 * 0.52), (12, 6.9338037 * 0.52)]),
    (0, 0, 2, &[(12, 2.9801714 * 0.56)]),
    (0, 0, 3, &[(14, 0.40682701 * 0.4)]),
    (0, 0, 4, &[(8, 4.8304080 * 0.58), (10, 1.8283094 * 0.56), (12, 0.83188098 * 0.56), (13, 0.45755407 * 0.6)]),
    (0, 1, 1, &[(12, 5.2977733 * 0.68), (13, 4.1776487 * 0.68)]),
    (0, 1, 2, &[(9, 6.0743246 * 0.66), (11, 3.2986801 * 0.66)]),
    (0, 1, 5, &[(10, 0.61743523 * 0.88)]),
    (0, 2, 2, &[(10, 3.0561156 * 0.77), (13, 0.82120308 * 0.82)]),
    (0, 2, 3, &[(10, 1.3586914 * 0.74), (11, 0.80764494 * 0.74)]),
    (1, 0, 0, &[(6, 4.4646498 * 0.54), (14, 1.8661903 * 0.54)]),
    (1, 0, 1, &[(6, 17.647416 * 0.65)]),
    (1, 0, 3, &[(11, 1.4693197 * 0.82), (13, 0.88926778 * 0.82)]),
    (1, 0, 4, &[(12, 0.74733002 * 0.82), (13, 0.42728863 * 0.86)]),
    (1, 0, 5, &[(11, 0.33611123 * 1.0)]),
    (1, 1, 1, &[(13, 4.3375146 * 0.86)]),
    (1, 2, 0, &[(11, 1.4457849 * 0.89)]),
    (2, 0, 0, &[(9, 3.2980074 * 0.72), (12, 2.1015206 * 0.8)]),
    (2, 0, 1, &[(11, 9.3967489 * 0.79), (13, 6.1780839 * 0.86)]),
    (2, 0, 2, &[(14, 1.6302581 * 1.0)]),
    (2, 0, 3, &[(14, 0.48591667 * 1.0)]),
    (2, 0, 4, &[(12, 0.73699003 * 0.9), (13, 0.57238499 * 0.94)]),
    (2, 0, 5, &[(7, 2.6180083 * 0.95)]),
    (2, 1, 0, &[(12, 1.9804747 * 0.85), (13, 1.6187124 * 0.85), (14, 1.2260020 * 0.85)]),
    (2, 1, 3, &[(11, 1.3141761 * 0.85), (13, 0.69913071 * 0.94)]),
    (2, 1, 4, &[(12, 0.89740300 * 1.0)]),
    (3, 0, 1, &[(11, 8.5798017 * 0.64), (12, 6.9298858 * 0.64)]),
    (3, 0, 3, &[(11, 1.4697244 * 0.67), (13, 0.85793671 * 0.71)]),
    (3, 0, 4, &[(12, 0.85350667 * 0.84), (13, 0.55984141 * 0.92)]),
    (3, 0, 5, &[(11, 0.31237633 * 1.0)]),
    (3, 1, 1, &[(13, 4.4053483 * 0.83)]),
    (3, 1, 2, &[(11, 3.3867984 * 0.77)]),
    (3, 1, 5, &[(10, 0.66608731 * 0.9)]),
    (3, 2, 0, &[(9, 2.1125765 * 0.77), (10, 1.9024753 * 0.79)]),
];
