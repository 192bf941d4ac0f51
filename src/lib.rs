pub mod mips;
