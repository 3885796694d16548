pub mod comps;
pub mod dcf;
pub mod growth;
pub mod wacc;
