pub mod payslip;

pub use payslip::{PayslipFileName, PeriodFilter};
