//! The fares archive's fixed-width decoder is explicitly out of scope
//! (spec §1, Non-goals): `hsp_core::FaresArchiveDecoder` is the seam a real
//! decoder plugs into. This is the one stubbed production implementation
//! the Non-goals call for — it always yields an empty set rather than
//! attempting to parse the opaque byte layout.

use hsp_core::client::{FaresArchive, FaresArchiveDecoder};
use hsp_core::domain::FareOffer;
use hsp_core::error::ClientError;

pub struct NullFaresDecoder;

impl FaresArchiveDecoder for NullFaresDecoder {
    fn decode(&self, _archive: &FaresArchive) -> Result<Vec<FareOffer>, ClientError> {
        Ok(Vec::new())
    }
}
