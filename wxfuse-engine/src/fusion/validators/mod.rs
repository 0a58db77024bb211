// Validators - Cross-Source Agreement
//
// agreement_scorer - dispersion + coverage → confidence percentage

pub mod agreement_scorer;
