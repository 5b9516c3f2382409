//! Shamir secret sharing over the secp256k1 scalar field.
//!
//! Payloads are cut into 30 byte chunks, each chunk is placed in
//! a 32 byte block behind a `0x00 0x01` marker so the block is a
//! non-zero field element, and every block is split separately.
//! Fragment `i` carries the `i`th share of every block.
//!
//! Fragment layout:
//!
//! ```text
//! format (1) || mode (1) || threshold (1) || index (1)
//!     || payload length (4, BE) || chunk count (4, BE)
//!     || chunk count * (share length (2, BE) || share)
//! ```
//!
//! A threshold of one cannot be expressed as a polynomial so the
//! payload is replicated into every fragment instead.
use crate::{Error, Fragment, FragmentProvider, Result};
use custodia_types::csprng;
use k256::{elliptic_curve::PrimeField, FieldBytes, Scalar};
use std::collections::BTreeMap;
use vsss_rs::{combine_shares, shamir};
use zeroize::Zeroizing;

/// Maximum number of fragments a payload can be split into.
pub const MAX_FRAGMENTS: usize = 255;

const FORMAT_VERSION: u8 = 1;
const MODE_SHAMIR: u8 = 0;
const MODE_REPLICA: u8 = 1;
const HEADER_LEN: usize = 12;
const BLOCK_LEN: usize = 32;
const BLOCK_MARKER: [u8; 2] = [0x00, 0x01];
const CHUNK_LEN: usize = BLOCK_LEN - BLOCK_MARKER.len();

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct Header {
    mode: u8,
    threshold: u8,
    index: u8,
    payload_len: u32,
    chunks: u32,
}

impl Header {
    fn write(&self, buffer: &mut Vec<u8>) {
        buffer.push(FORMAT_VERSION);
        buffer.push(self.mode);
        buffer.push(self.threshold);
        buffer.push(self.index);
        buffer.extend_from_slice(&self.payload_len.to_be_bytes());
        buffer.extend_from_slice(&self.chunks.to_be_bytes());
    }

    fn read(bytes: &[u8]) -> Result<(Self, &[u8])> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::InvalidFragment("truncated header".to_owned()));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if header[0] != FORMAT_VERSION {
            return Err(Error::InvalidFragment(format!(
                "unknown format {}",
                header[0]
            )));
        }
        let mode = header[1];
        if mode != MODE_SHAMIR && mode != MODE_REPLICA {
            return Err(Error::InvalidFragment(format!("unknown mode {mode}")));
        }
        let threshold = header[2];
        let index = header[3];
        if threshold == 0 || index == 0 {
            return Err(Error::InvalidFragment(
                "zero threshold or index".to_owned(),
            ));
        }
        let payload_len =
            u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        let chunks =
            u32::from_be_bytes([header[8], header[9], header[10], header[11]]);

        // Bound the body before anything is sized from the header
        let expected_chunks = if mode == MODE_REPLICA {
            0
        } else {
            (payload_len as usize).div_ceil(CHUNK_LEN)
        };
        if chunks as usize != expected_chunks {
            return Err(Error::InvalidFragment(format!(
                "{chunks} chunks for a payload of {payload_len} bytes"
            )));
        }
        let min_body = if mode == MODE_REPLICA {
            payload_len as usize
        } else {
            expected_chunks * 2
        };
        if body.len() < min_body {
            return Err(Error::InvalidFragment("truncated body".to_owned()));
        }
        Ok((
            Self {
                mode,
                threshold,
                index,
                payload_len,
                chunks,
            },
            body,
        ))
    }

    /// Whether two headers describe fragments of the same split.
    fn matches(&self, other: &Header) -> bool {
        self.mode == other.mode
            && self.threshold == other.threshold
            && self.payload_len == other.payload_len
            && self.chunks == other.chunks
    }
}

/// Fragment provider using Shamir secret sharing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShamirProvider;

impl ShamirProvider {
    fn split_chunks(
        &self,
        payload: &[u8],
        count: usize,
        threshold: usize,
        bodies: &mut [Vec<u8>],
    ) -> Result<()> {
        let mut rng = csprng();
        for chunk in payload.chunks(CHUNK_LEN) {
            let mut block = Zeroizing::new([0u8; BLOCK_LEN]);
            block[..BLOCK_MARKER.len()].copy_from_slice(&BLOCK_MARKER);
            block[BLOCK_MARKER.len()..BLOCK_MARKER.len() + chunk.len()]
                .copy_from_slice(chunk);

            let secret: Option<Scalar> =
                Scalar::from_repr(FieldBytes::clone_from_slice(&block[..]))
                    .into();
            let secret = secret.ok_or_else(|| {
                Error::Vsss("block is not a field element".to_owned())
            })?;

            let shares = shamir::split_secret::<Scalar, u8, Vec<u8>>(
                threshold, count, secret, &mut rng,
            )
            .map_err(|e| Error::Vsss(e.to_string()))?;

            for (body, share) in bodies.iter_mut().zip(shares) {
                body.extend_from_slice(&(share.len() as u16).to_be_bytes());
                body.extend_from_slice(&share);
            }
        }
        Ok(())
    }

    fn read_shares(body: &[u8], chunks: usize) -> Result<Vec<Vec<u8>>> {
        let mut shares = Vec::with_capacity(chunks);
        let mut rest = body;
        for _ in 0..chunks {
            if rest.len() < 2 {
                return Err(Error::InvalidFragment(
                    "truncated share length".to_owned(),
                ));
            }
            let len = u16::from_be_bytes([rest[0], rest[1]]) as usize;
            rest = &rest[2..];
            if rest.len() < len {
                return Err(Error::InvalidFragment(
                    "truncated share".to_owned(),
                ));
            }
            let (share, tail) = rest.split_at(len);
            shares.push(share.to_vec());
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(Error::InvalidFragment("trailing bytes".to_owned()));
        }
        Ok(shares)
    }
}

impl FragmentProvider for ShamirProvider {
    fn split(
        &self,
        payload: &[u8],
        count: usize,
        threshold: usize,
    ) -> Result<Vec<Fragment>> {
        if count > MAX_FRAGMENTS {
            return Err(Error::TooManyFragments(count, MAX_FRAGMENTS));
        }
        if threshold == 0 || threshold > count {
            return Err(Error::InvalidThreshold { threshold, count });
        }
        let payload_len: u32 = payload
            .len()
            .try_into()
            .map_err(|_| Error::PayloadTooLarge(payload.len()))?;

        let replica = threshold == 1;
        let chunks = if replica {
            0
        } else {
            payload.len().div_ceil(CHUNK_LEN) as u32
        };

        let mut bodies: Vec<Vec<u8>> = (0..count)
            .map(|i| {
                let mut body = Vec::new();
                Header {
                    mode: if replica { MODE_REPLICA } else { MODE_SHAMIR },
                    threshold: threshold as u8,
                    index: (i + 1) as u8,
                    payload_len,
                    chunks,
                }
                .write(&mut body);
                body
            })
            .collect();

        if replica {
            for body in bodies.iter_mut() {
                body.extend_from_slice(payload);
            }
        } else {
            self.split_chunks(payload, count, threshold, &mut bodies)?;
        }

        tracing::debug!(
            count = %count,
            threshold = %threshold,
            chunks = %chunks,
            "shamir::split",
        );

        Ok(bodies.into_iter().map(Fragment::from).collect())
    }

    fn combine(&self, fragments: &[Fragment]) -> Result<Vec<u8>> {
        let mut reference: Option<Header> = None;
        let mut distinct: BTreeMap<u8, &[u8]> = BTreeMap::new();
        for fragment in fragments {
            let (header, body) = Header::read(fragment.as_bytes())?;
            match &reference {
                Some(expected) if !expected.matches(&header) => {
                    return Err(Error::InvalidFragment(
                        "fragments belong to different splits".to_owned(),
                    ));
                }
                Some(_) => {}
                None => reference = Some(header),
            }
            distinct.entry(header.index).or_insert(body);
        }

        let Some(header) = reference else {
            return Err(Error::InsufficientFragments { have: 0, need: 1 });
        };
        let need = header.threshold as usize;
        if distinct.len() < need {
            return Err(Error::InsufficientFragments {
                have: distinct.len(),
                need,
            });
        }

        let payload_len = header.payload_len as usize;
        if header.mode == MODE_REPLICA {
            let body = distinct.values().next().copied().unwrap_or_default();
            if body.len() != payload_len {
                return Err(Error::InvalidFragment(
                    "replica length mismatch".to_owned(),
                ));
            }
            return Ok(body.to_vec());
        }

        let chunks = header.chunks as usize;
        let selected = distinct
            .values()
            .take(need)
            .map(|body| Self::read_shares(body, chunks))
            .collect::<Result<Vec<_>>>()?;

        let mut payload = Vec::with_capacity(chunks * CHUNK_LEN);
        for chunk in 0..chunks {
            let shares: Vec<Vec<u8>> =
                selected.iter().map(|s| s[chunk].clone()).collect();
            let scalar: Scalar = combine_shares(&shares)
                .map_err(|e| Error::Vsss(e.to_string()))?;
            let mut block = Zeroizing::new([0u8; BLOCK_LEN]);
            block.copy_from_slice(&scalar.to_repr());
            if block[..BLOCK_MARKER.len()] != BLOCK_MARKER {
                return Err(Error::InvalidFragment(
                    "combined block is corrupt".to_owned(),
                ));
            }
            payload.extend_from_slice(&block[BLOCK_MARKER.len()..]);
        }

        if payload.len() < payload_len {
            return Err(Error::InvalidFragment(
                "payload shorter than header length".to_owned(),
            ));
        }
        payload.truncate(payload_len);
        Ok(payload)
    }
}
