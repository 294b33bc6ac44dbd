pub mod osr;
