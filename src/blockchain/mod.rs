pub mod elastos;
pub mod ethereum;

#[cfg(feature = "bitcoin")]
pub mod bitcoin;
