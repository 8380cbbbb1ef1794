/// Radial (ring) fingerprint of an image.
///
/// Produced only by [`Fingerprinter::image_digest`](crate::Fingerprinter::image_digest);
/// there are no mutators. `Digest::default()` yields a digest without a
/// coefficient sequence, which every consumer rejects as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Digest {
    id: Option<String>,
    coeffs: Option<Vec<u8>>,
    size: usize,
}

impl Digest {
    pub(crate) fn new(id: Option<String>, coeffs: Vec<u8>) -> Self {
        let size = coeffs.len();
        Self {
            id,
            coeffs: Some(coeffs),
            size,
        }
    }

    /// Opaque identifier; always `None` for radial digests
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Coefficients in angular-bin order, if set
    pub fn coeffs(&self) -> Option<&[u8]> {
        self.coeffs.as_deref()
    }

    /// Number of coefficients
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the coefficient sequence is present and agrees with `size`
    pub fn is_well_formed(&self) -> bool {
        matches!(&self.coeffs, Some(coeffs) if coeffs.len() == self.size)
    }
}
