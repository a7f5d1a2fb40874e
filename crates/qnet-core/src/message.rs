//! Control messages and their wire codec
//!
//! Every control message travels as a fixed 17-byte record, multi-byte
//! fields in network byte order:
//!
//! | offset | size | field                   |
//! |--------|------|-------------------------|
//! | 0      | 4    | source address          |
//! | 4      | 4    | destination address     |
//! | 8      | 4    | flow identifier         |
//! | 12     | 1    | operation code          |
//! | 13     | 4    | auxiliary (qubit) index |
//!
//! The record has no length prefix. Decoding never validates the operation
//! code: unrecognized values are carried through as raw [`OpCode`]s so that
//! collaborators can introduce new operations without breaking relays.

use std::fmt::{self, Display};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::address::NodeAddress;
use crate::error::CodecError;

/// Flow identifier of an entanglement request
pub type FlowId = u32;

/// Known control operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperationType {
    /// Request end-to-end EPR pair generation along a path
    EprGenRequest = 1,
    /// EPR generation completed
    EprGenSuccess = 2,
    /// EPR generation failed
    EprGenFailure = 3,
    /// Request an entanglement swap at a repeater
    EntSwapRequest = 4,
    /// Entanglement swap completed
    EntSwapSuccess = 5,
    /// Request purification of a pair
    PurifyRequest = 6,
    /// Measurement result notification
    MeasureNotification = 7,
}

impl OperationType {
    /// All known operations in code order
    pub const ALL: [OperationType; 7] = [
        OperationType::EprGenRequest,
        OperationType::EprGenSuccess,
        OperationType::EprGenFailure,
        OperationType::EntSwapRequest,
        OperationType::EntSwapSuccess,
        OperationType::PurifyRequest,
        OperationType::MeasureNotification,
    ];

    /// Wire value of this operation
    pub const fn code(self) -> OpCode {
        OpCode(self as u8)
    }

    /// Protocol name, as used in logs
    pub fn name(self) -> &'static str {
        match self {
            OperationType::EprGenRequest => "EPR_GEN_REQUEST",
            OperationType::EprGenSuccess => "EPR_GEN_SUCCESS",
            OperationType::EprGenFailure => "EPR_GEN_FAILURE",
            OperationType::EntSwapRequest => "ENT_SWAP_REQUEST",
            OperationType::EntSwapSuccess => "ENT_SWAP_SUCCESS",
            OperationType::PurifyRequest => "PURIFY_REQUEST",
            OperationType::MeasureNotification => "MEASURE_NOTIFICATION",
        }
    }
}

impl From<OperationType> for OpCode {
    fn from(op: OperationType) -> Self {
        op.code()
    }
}

/// Raw operation code as carried on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpCode(pub u8);

impl OpCode {
    /// Classify this code, `None` for values outside the known set
    pub fn kind(self) -> Option<OperationType> {
        OperationType::ALL.into_iter().find(|op| *op as u8 == self.0)
    }

    /// Check whether this code is a given operation
    pub fn is(self, op: OperationType) -> bool {
        self.0 == op as u8
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            Some(op) => f.write_str(op.name()),
            None => write!(f, "UNKNOWN({})", self.0),
        }
    }
}

/// A classical control message exchanged between adjacent nodes
///
/// Messages are immutable: a relay re-transmits the exact value it received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlMessage {
    source: NodeAddress,
    destination: NodeAddress,
    flow_id: FlowId,
    op: OpCode,
    qubit_index: u32,
}

impl ControlMessage {
    /// Size of an encoded message in bytes
    pub const WIRE_SIZE: usize = 4 + 4 + 4 + 1 + 4;

    /// Create a new control message
    pub fn new(
        source: NodeAddress,
        destination: NodeAddress,
        flow_id: FlowId,
        op: impl Into<OpCode>,
    ) -> Self {
        Self {
            source,
            destination,
            flow_id,
            op: op.into(),
            qubit_index: 0,
        }
    }

    /// Create an `EPR_GEN_REQUEST` for a flow
    pub fn epr_request(source: NodeAddress, destination: NodeAddress, flow_id: FlowId) -> Self {
        Self::new(source, destination, flow_id, OperationType::EprGenRequest)
    }

    /// Return a copy carrying the given auxiliary qubit index
    pub fn with_qubit_index(mut self, qubit_index: u32) -> Self {
        self.qubit_index = qubit_index;
        self
    }

    /// Build a response sent from `responder` back to this message's source
    pub fn reply(&self, responder: NodeAddress, op: OperationType) -> Self {
        Self::new(responder, self.source, self.flow_id, op).with_qubit_index(self.qubit_index)
    }

    pub fn source(&self) -> NodeAddress {
        self.source
    }

    pub fn destination(&self) -> NodeAddress {
        self.destination
    }

    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    pub fn op(&self) -> OpCode {
        self.op
    }

    pub fn qubit_index(&self) -> u32 {
        self.qubit_index
    }

    /// Encode into a freshly allocated 17-byte buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::WIRE_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the wire representation to `buf`
    pub fn encode_into<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32(self.source.to_bits());
        buf.put_u32(self.destination.to_bits());
        buf.put_u32(self.flow_id);
        buf.put_u8(self.op.0);
        buf.put_u32(self.qubit_index);
    }

    /// Decode a message from the start of `bytes`
    ///
    /// Bytes past the fixed record size are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < Self::WIRE_SIZE {
            return Err(CodecError::Truncated {
                expected: Self::WIRE_SIZE,
                actual: bytes.len(),
            });
        }

        let mut buf = bytes;
        let source = NodeAddress::from_bits(buf.get_u32());
        let destination = NodeAddress::from_bits(buf.get_u32());
        let flow_id = buf.get_u32();
        let op = OpCode(buf.get_u8());
        let qubit_index = buf.get_u32();

        Ok(Self {
            source,
            destination,
            flow_id,
            op,
            qubit_index,
        })
    }
}

impl Display for ControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "src={} dst={} flowId={} type={}",
            self.source, self.destination, self.flow_id, self.op
        )
    }
}
