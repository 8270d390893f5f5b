// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// mmWave vital-signs frame decoder
//
// Packet layout (all integers little-endian):
// - 8 byte magic word
// - 32 byte header: version, total_packet_len, platform, frame_number,
//   time_cpu_cycles, num_detected_obj, num_tlvs, subframe_number
// - num_tlvs x (type u32, payload length u32, payload)

use bytes::{Buf, BytesMut};
use thiserror::Error;

pub const MAGIC_WORD: [u8; 8] = [0x02, 0x01, 0x04, 0x03, 0x06, 0x05, 0x08, 0x07];
pub const HEADER_LEN: usize = 40;
pub const TLV_HEADER_LEN: usize = 8;
pub const TLV_VITAL_SIGNS: u32 = 6;

/// Larger declared lengths are treated as corruption rather than buffered.
const MAX_PACKET_LEN: usize = 64 * 1024;

/// Fixed prefix of the vital-signs TLV before the float statistics.
const VITAL_SIGNS_PREFIX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("Declared packet length {0} is out of range")]
    BadLength(usize),

    #[error("TLV {index} overruns packet ({needed} bytes needed, {available} available)")]
    TlvOverrun {
        index: u32,
        needed: usize,
        available: usize,
    },

    #[error("Vital-signs payload too short: {0} bytes")]
    ShortVitalSigns(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub version: u32,
    pub total_packet_len: u32,
    pub platform: u32,
    pub frame_number: u32,
    pub time_cpu_cycles: u32,
    pub num_detected_obj: u32,
    pub num_tlvs: u32,
    pub subframe_number: u32,
}

/// Vital-signs statistics reported by the radar.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VitalSigns {
    pub range_bin_index_max: u16,
    pub range_bin_index_phase: u16,
    pub max_val: f32,
    pub processing_cycles_out: u32,
    pub range_bin_start_index: u16,
    pub range_bin_end_index: u16,
    /// Float statistics in `FIELD_NAMES` order; firmware may send fewer.
    pub values: Vec<f32>,
}

impl VitalSigns {
    pub const FIELD_NAMES: &'static [&'static str] = &[
        "unwrapPhasePeak_mm",
        "outputFilterBreathOut",
        "outputFilterHeartOut",
        "heartRateEst_FFT",
        "heartRateEst_FFT_4Hz",
        "heartRateEst_xCorr",
        "heartRateEst_peakCount",
        "breathingRateEst_FFT",
        "breathingEst_xCorr",
        "breathingEst_peakCount",
        "confidenceMetricBreathOut",
        "confidenceMetricBreathOut_xCorr",
        "confidenceMetricHeartOut",
        "confidenceMetricHeartOut_4Hz",
        "confidenceMetricHeartOut_xCorr",
        "sumEnergyBreathWfm",
        "sumEnergyHeartWfm",
        "motionDetectedFlag",
    ];

    fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < VITAL_SIGNS_PREFIX_LEN {
            return Err(FrameError::ShortVitalSigns(payload.len()));
        }

        let mut cur = payload;
        let mut vs = VitalSigns {
            range_bin_index_max: cur.get_u16_le(),
            range_bin_index_phase: cur.get_u16_le(),
            max_val: cur.get_f32_le(),
            processing_cycles_out: cur.get_u32_le(),
            range_bin_start_index: cur.get_u16_le(),
            range_bin_end_index: cur.get_u16_le(),
            values: Vec::with_capacity(Self::FIELD_NAMES.len()),
        };

        while cur.remaining() >= 4 && vs.values.len() < Self::FIELD_NAMES.len() {
            vs.values.push(cur.get_f32_le());
        }

        Ok(vs)
    }

    /// Look up a float statistic by its firmware name.
    pub fn field(&self, name: &str) -> Option<f64> {
        let index = Self::FIELD_NAMES.iter().position(|f| *f == name)?;
        self.values.get(index).map(|v| f64::from(*v))
    }
}

/// One decoded radar packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    pub vital_signs: Option<VitalSigns>,
}

impl Frame {
    /// Extract the named scalar; `None` when the packet carried no such value.
    pub fn value(&self, field: &str) -> Option<f64> {
        self.vital_signs.as_ref().and_then(|vs| vs.field(field))
    }
}

/// Try to decode one packet from the front of `buf`.
///
/// Returns `Ok(None)` when more bytes are needed. Bytes preceding a magic
/// word are discarded, and a malformed packet is consumed so the next call
/// resynchronises on the following magic word.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
    match find_magic(buf) {
        Some(0) => {}
        Some(pos) => buf.advance(pos),
        None => {
            // Keep a possible partial magic word at the tail
            let keep = (MAGIC_WORD.len() - 1).min(buf.len());
            let discard = buf.len() - keep;
            buf.advance(discard);
            return Ok(None);
        }
    }

    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let header = parse_header(&buf[MAGIC_WORD.len()..HEADER_LEN]);
    let total_len = header.total_packet_len as usize;
    if !(HEADER_LEN..=MAX_PACKET_LEN).contains(&total_len) {
        buf.advance(MAGIC_WORD.len());
        return Err(FrameError::BadLength(total_len));
    }

    if buf.len() < total_len {
        return Ok(None);
    }

    let packet = buf.split_to(total_len).freeze();
    let mut body = &packet[HEADER_LEN..];
    let mut vital_signs = None;

    for index in 0..header.num_tlvs {
        if body.remaining() < TLV_HEADER_LEN {
            return Err(FrameError::TlvOverrun {
                index,
                needed: TLV_HEADER_LEN,
                available: body.remaining(),
            });
        }
        let tlv_type = body.get_u32_le();
        let tlv_len = body.get_u32_le() as usize;
        if body.remaining() < tlv_len {
            return Err(FrameError::TlvOverrun {
                index,
                needed: tlv_len,
                available: body.remaining(),
            });
        }

        if tlv_type == TLV_VITAL_SIGNS {
            vital_signs = Some(VitalSigns::parse(&body[..tlv_len])?);
        }
        body.advance(tlv_len);
    }

    Ok(Some(Frame {
        header,
        vital_signs,
    }))
}

fn find_magic(buf: &[u8]) -> Option<usize> {
    buf.windows(MAGIC_WORD.len()).position(|w| w == MAGIC_WORD)
}

fn parse_header(mut cur: &[u8]) -> FrameHeader {
    FrameHeader {
        version: cur.get_u32_le(),
        total_packet_len: cur.get_u32_le(),
        platform: cur.get_u32_le(),
        frame_number: cur.get_u32_le(),
        time_cpu_cycles: cur.get_u32_le(),
        num_detected_obj: cur.get_u32_le(),
        num_tlvs: cur.get_u32_le(),
        subframe_number: cur.get_u32_le(),
    }
}

/// Encode a vital-signs packet; used by tests and scripted sensors.
pub fn encode_vital_signs_packet(frame_number: u32, values: &[f32]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(VITAL_SIGNS_PREFIX_LEN + values.len() * 4);
    payload.extend_from_slice(&1u16.to_le_bytes());
    payload.extend_from_slice(&2u16.to_le_bytes());
    payload.extend_from_slice(&0.5f32.to_le_bytes());
    payload.extend_from_slice(&0u32.to_le_bytes());
    payload.extend_from_slice(&3u16.to_le_bytes());
    payload.extend_from_slice(&9u16.to_le_bytes());
    for v in values {
        payload.extend_from_slice(&v.to_le_bytes());
    }

    encode_packet(frame_number, &[(TLV_VITAL_SIGNS, payload)])
}

/// Encode a packet from raw TLVs.
pub fn encode_packet(frame_number: u32, tlvs: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let body_len: usize = tlvs.iter().map(|(_, p)| TLV_HEADER_LEN + p.len()).sum();
    let total_len = (HEADER_LEN + body_len) as u32;

    let mut out = Vec::with_capacity(total_len as usize);
    out.extend_from_slice(&MAGIC_WORD);
    for field in [
        0x0102_0000,
        total_len,
        0x000A_1642,
        frame_number,
        0,
        0,
        tlvs.len() as u32,
        0,
    ] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    for (tlv_type, payload) in tlvs {
        out.extend_from_slice(&tlv_type.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
    }
    out
}
