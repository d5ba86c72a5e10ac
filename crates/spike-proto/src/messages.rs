//! Message registry: maps a leading ID byte to a concrete, typed payload.
//!
//! Concrete message bodies beyond the two sizing fields the rest of this
//! workspace depends on (`max_packet_size`, `max_chunk_size`) are not
//! dictated by any external wire format this crate must interoperate with;
//! the layouts below are this workspace's own minimal, internally
//! consistent choice, grounded on the real hub's InfoResponse field offsets
//! where those are known and otherwise invented but documented.

use crate::error::ProtocolError;

/// One decoded protocol message. The ID byte a variant serializes to is
/// returned by [`Message::id`] and is always the first byte of its encoded
/// form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Request the hub's RPC version and negotiated packet/chunk sizes.
    InfoRequest,
    /// The hub's reply to [`Message::InfoRequest`].
    InfoResponse(InfoResponse),
    /// Ask the hub to start (or stop) periodic unsolicited notifications.
    DeviceNotificationRequest {
        /// Notification period in milliseconds.
        period_ms: u16,
    },
    /// Acknowledges a [`Message::DeviceNotificationRequest`].
    DeviceNotificationResponse,
    /// Unsolicited sensor/motor telemetry. Interpreting the body is a
    /// consumer concern; this crate passes it through untouched.
    DeviceNotification {
        /// Opaque telemetry payload.
        body: Vec<u8>,
    },
    /// Begin a file upload into a program slot.
    StartFileUploadRequest {
        /// Program name.
        name: String,
        /// Destination slot, 0-19.
        slot: u8,
        /// CRC-32 of the complete file, seeded at 0.
        crc: u32,
    },
    /// Acknowledges [`Message::StartFileUploadRequest`].
    StartFileUploadResponse {
        /// `true` if the hub accepted the upload.
        ok: bool,
    },
    /// One chunk of file data plus the running CRC through this chunk.
    TransferChunkRequest {
        /// CRC-32 of every byte transferred so far, including this chunk.
        running_crc: u32,
        /// Chunk bytes.
        data: Vec<u8>,
    },
    /// Acknowledges [`Message::TransferChunkRequest`].
    TransferChunkResponse {
        /// `true` if the chunk's CRC matched what the hub computed.
        ok: bool,
    },
    /// Start or stop the program in a slot.
    ProgramFlowRequest {
        /// `true` to stop a running program, `false` to start.
        stop: bool,
        /// Target slot.
        slot: u8,
    },
    /// Acknowledges [`Message::ProgramFlowRequest`].
    ProgramFlowResponse {
        /// `true` if the hub carried out the request.
        ok: bool,
    },
    /// Clear (erase) a program slot.
    ClearSlotRequest {
        /// Target slot.
        slot: u8,
    },
    /// Acknowledges [`Message::ClearSlotRequest`].
    ClearSlotResponse {
        /// `true` if the slot was cleared.
        ok: bool,
    },
}

/// The two sizing fields this workspace's CORE depends on, decoded from the
/// real hub's InfoResponse body layout: `max_packet_size` as a little-endian
/// `u16` at byte offset 7, `max_chunk_size` as a little-endian `u16` at byte
/// offset 11. RPC version bytes and reserved gaps are preserved verbatim but
/// otherwise untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoResponse {
    /// RPC major version, byte offset 1.
    pub rpc_major: u8,
    /// RPC minor version, byte offset 2.
    pub rpc_minor: u8,
    /// Maximum bytes in a single GATT write.
    pub max_packet_size: u16,
    /// Maximum payload bytes in one `TransferChunkRequest`.
    pub max_chunk_size: u16,
    /// The raw response body, preserved for bytes this crate does not
    /// interpret.
    pub raw: Vec<u8>,
}

mod id {
    pub const INFO_REQUEST: u8 = 0x00;
    pub const INFO_RESPONSE: u8 = 0x01;
    pub const START_FILE_UPLOAD_REQUEST: u8 = 0x0C;
    pub const START_FILE_UPLOAD_RESPONSE: u8 = 0x0D;
    pub const TRANSFER_CHUNK_REQUEST: u8 = 0x10;
    pub const TRANSFER_CHUNK_RESPONSE: u8 = 0x11;
    pub const PROGRAM_FLOW_REQUEST: u8 = 0x1E;
    pub const PROGRAM_FLOW_RESPONSE: u8 = 0x1F;
    pub const DEVICE_NOTIFICATION_REQUEST: u8 = 0x28;
    pub const DEVICE_NOTIFICATION_RESPONSE: u8 = 0x29;
    pub const DEVICE_NOTIFICATION: u8 = 0x3C;
    pub const CLEAR_SLOT_REQUEST: u8 = 0x46;
    pub const CLEAR_SLOT_RESPONSE: u8 = 0x47;
}

/// Offset of `max_packet_size` within an InfoResponse body (ID byte at 0).
const INFO_MAX_PACKET_OFFSET: usize = 7;
/// Offset of `max_chunk_size` within an InfoResponse body (ID byte at 0).
const INFO_MAX_CHUNK_OFFSET: usize = 11;
/// Minimum InfoResponse body length needed to read both sizing fields.
const INFO_MIN_LEN: usize = INFO_MAX_CHUNK_OFFSET + 2;

impl Message {
    /// The leading ID byte this message serializes to.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            Self::InfoRequest => id::INFO_REQUEST,
            Self::InfoResponse(_) => id::INFO_RESPONSE,
            Self::DeviceNotificationRequest { .. } => id::DEVICE_NOTIFICATION_REQUEST,
            Self::DeviceNotificationResponse => id::DEVICE_NOTIFICATION_RESPONSE,
            Self::DeviceNotification { .. } => id::DEVICE_NOTIFICATION,
            Self::StartFileUploadRequest { .. } => id::START_FILE_UPLOAD_REQUEST,
            Self::StartFileUploadResponse { .. } => id::START_FILE_UPLOAD_RESPONSE,
            Self::TransferChunkRequest { .. } => id::TRANSFER_CHUNK_REQUEST,
            Self::TransferChunkResponse { .. } => id::TRANSFER_CHUNK_RESPONSE,
            Self::ProgramFlowRequest { .. } => id::PROGRAM_FLOW_REQUEST,
            Self::ProgramFlowResponse { .. } => id::PROGRAM_FLOW_RESPONSE,
            Self::ClearSlotRequest { .. } => id::CLEAR_SLOT_REQUEST,
            Self::ClearSlotResponse { .. } => id::CLEAR_SLOT_RESPONSE,
        }
    }

    /// Serializes this message to a payload whose first byte is [`Message::id`].
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.id()];
        match self {
            Self::InfoRequest
            | Self::DeviceNotificationResponse
            | Self::StartFileUploadResponse { ok: false }
            | Self::TransferChunkResponse { ok: false }
            | Self::ProgramFlowResponse { ok: false }
            | Self::ClearSlotResponse { ok: false } => {},
            Self::InfoResponse(info) => out.extend_from_slice(&info.raw),
            Self::DeviceNotificationRequest { period_ms } => {
                out.extend_from_slice(&period_ms.to_le_bytes());
            },
            Self::DeviceNotification { body } => out.extend_from_slice(body),
            Self::StartFileUploadRequest { name, slot, crc } => {
                let name_bytes = name.as_bytes();
                out.push(name_bytes.len() as u8);
                out.extend_from_slice(name_bytes);
                out.push(*slot);
                out.extend_from_slice(&crc.to_le_bytes());
            },
            Self::StartFileUploadResponse { ok: true }
            | Self::TransferChunkResponse { ok: true }
            | Self::ProgramFlowResponse { ok: true }
            | Self::ClearSlotResponse { ok: true } => out.push(0),
            Self::TransferChunkRequest { running_crc, data } => {
                out.extend_from_slice(&running_crc.to_le_bytes());
                out.extend_from_slice(data);
            },
            Self::ProgramFlowRequest { stop, slot } => {
                out.push(u8::from(*stop));
                out.push(*slot);
            },
            Self::ClearSlotRequest { slot } => out.push(*slot),
        }
        out
    }

    /// Decodes a payload (ID byte plus body) into a typed message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownMessageId`] for an ID with no
    /// decoder, and [`ProtocolError::PayloadTooShort`] if the body is
    /// shorter than the message type requires.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let &[msg_id, ref body @ ..] = payload else {
            return Err(ProtocolError::UnknownMessageId(0));
        };

        match msg_id {
            id::INFO_REQUEST => Ok(Self::InfoRequest),
            id::INFO_RESPONSE => decode_info_response(body),
            id::DEVICE_NOTIFICATION_REQUEST => {
                require_len(msg_id, body, 2)?;
                let period_ms = u16::from_le_bytes([body[0], body[1]]);
                Ok(Self::DeviceNotificationRequest { period_ms })
            },
            id::DEVICE_NOTIFICATION_RESPONSE => Ok(Self::DeviceNotificationResponse),
            id::DEVICE_NOTIFICATION => Ok(Self::DeviceNotification { body: body.to_vec() }),
            id::START_FILE_UPLOAD_REQUEST => decode_start_file_upload(msg_id, body),
            id::START_FILE_UPLOAD_RESPONSE => {
                require_len(msg_id, body, 1)?;
                Ok(Self::StartFileUploadResponse { ok: body[0] == 0 })
            },
            id::TRANSFER_CHUNK_REQUEST => {
                require_len(msg_id, body, 4)?;
                let running_crc = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
                Ok(Self::TransferChunkRequest { running_crc, data: body[4..].to_vec() })
            },
            id::TRANSFER_CHUNK_RESPONSE => {
                require_len(msg_id, body, 1)?;
                Ok(Self::TransferChunkResponse { ok: body[0] == 0 })
            },
            id::PROGRAM_FLOW_REQUEST => {
                require_len(msg_id, body, 2)?;
                Ok(Self::ProgramFlowRequest { stop: body[0] != 0, slot: body[1] })
            },
            id::PROGRAM_FLOW_RESPONSE => {
                require_len(msg_id, body, 1)?;
                Ok(Self::ProgramFlowResponse { ok: body[0] == 0 })
            },
            id::CLEAR_SLOT_REQUEST => {
                require_len(msg_id, body, 1)?;
                Ok(Self::ClearSlotRequest { slot: body[0] })
            },
            id::CLEAR_SLOT_RESPONSE => {
                require_len(msg_id, body, 1)?;
                Ok(Self::ClearSlotResponse { ok: body[0] == 0 })
            },
            unknown => Err(ProtocolError::UnknownMessageId(unknown)),
        }
    }
}

fn require_len(id: u8, body: &[u8], need: usize) -> Result<(), ProtocolError> {
    if body.len() < need {
        return Err(ProtocolError::PayloadTooShort { id, need, have: body.len() });
    }
    Ok(())
}

fn decode_info_response(body: &[u8]) -> Result<Message, ProtocolError> {
    require_len(id::INFO_RESPONSE, body, INFO_MIN_LEN)?;
    let max_packet_size =
        u16::from_le_bytes([body[INFO_MAX_PACKET_OFFSET], body[INFO_MAX_PACKET_OFFSET + 1]]);
    let max_chunk_size =
        u16::from_le_bytes([body[INFO_MAX_CHUNK_OFFSET], body[INFO_MAX_CHUNK_OFFSET + 1]]);
    Ok(Message::InfoResponse(InfoResponse {
        rpc_major: body[0],
        rpc_minor: body[1],
        max_packet_size,
        max_chunk_size,
        raw: body.to_vec(),
    }))
}

fn decode_start_file_upload(msg_id: u8, body: &[u8]) -> Result<Message, ProtocolError> {
    require_len(msg_id, body, 1)?;
    let name_len = body[0] as usize;
    require_len(msg_id, body, 1 + name_len + 1 + 4)?;
    let name = String::from_utf8_lossy(&body[1..1 + name_len]).into_owned();
    let slot = body[1 + name_len];
    let crc_offset = 1 + name_len + 1;
    let crc = u32::from_le_bytes([
        body[crc_offset],
        body[crc_offset + 1],
        body[crc_offset + 2],
        body[crc_offset + 3],
    ]);
    Ok(Message::StartFileUploadRequest { name, slot, crc })
}
