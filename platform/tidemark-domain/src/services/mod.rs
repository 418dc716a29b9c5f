pub mod reshape;
