//! The JSON signaling wire format exchanged over `/ws`.
//!
//! RTP parameters, DTLS parameters, and RTP capabilities are never inspected
//! by this crate — they are opaque JSON sub-trees forwarded verbatim between
//! the client and the SFU facade, so they are typed as `serde_json::Value`
//! rather than given a concrete shape here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id_types::ParticipantId;

/// A message received from a client session.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Join {
        #[serde(rename = "roomId", default)]
        room_id: Option<String>,
        #[serde(rename = "rtpCapabilities", default)]
        rtp_capabilities: Option<Value>,
    },
    Leave,
    #[serde(rename = "connect-transport")]
    ConnectTransport {
        #[serde(rename = "transportId")]
        transport_id: String,
        #[serde(rename = "dtlsParameters")]
        dtls_parameters: Value,
    },
    Produce {
        #[serde(rename = "transportId")]
        transport_id: String,
        kind: MediaKind,
        #[serde(rename = "rtpParameters")]
        rtp_parameters: Value,
    },
    #[serde(rename = "request-consume")]
    RequestConsume {
        #[serde(rename = "producerId")]
        producer_id: String,
        #[serde(rename = "rtpCapabilities")]
        rtp_capabilities: Value,
    },
    #[serde(rename = "nickname-change")]
    NicknameChange {
        nickname: String,
        #[serde(rename = "previousName", default)]
        previous_name: Option<String>,
    },
    #[serde(rename = "participant-killed")]
    ParticipantKilled { killed: bool },
    Ping,
}

/// Media kind, shared between the client-facing protocol and the facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// A message sent to a client session.
///
/// The wire convention is mixed: responses carry `{type, data: {...}}`,
/// while simple notifications may carry fields at the top level. Clients
/// must tolerate both for the same message type, so this enum always emits
/// the `data` wrapper — the richer, always-valid shape.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    Welcome {
        data: WelcomeData,
    },
    #[serde(rename = "new-producer")]
    NewProducer {
        data: NewProducerData,
    },
    #[serde(rename = "produce-response")]
    ProduceResponse {
        data: ProduceResponseData,
    },
    #[serde(rename = "consume-response")]
    ConsumeResponse {
        data: ConsumeResponseData,
    },
    #[serde(rename = "producer-closed")]
    ProducerClosed {
        data: ProducerClosedData,
    },
    Disconnect {
        #[serde(rename = "participantId")]
        participant_id: ParticipantId,
    },
    #[serde(rename = "nickname-change")]
    NicknameChange {
        data: NicknameChangeData,
    },
    #[serde(rename = "participant-killed")]
    ParticipantKilled {
        data: ParticipantKilledData,
    },
    Pong,
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct WelcomeData {
    #[serde(rename = "routerRtpCapabilities")]
    pub router_rtp_capabilities: Value,
    #[serde(rename = "webRtcTransportOptions")]
    pub web_rtc_transport_options: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewProducerData {
    #[serde(rename = "producerId")]
    pub producer_id: String,
    #[serde(rename = "participantId")]
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProduceResponseData {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConsumeResponseData {
    #[serde(rename = "consumerId")]
    pub consumer_id: String,
    #[serde(rename = "producerId")]
    pub producer_id: String,
    pub kind: MediaKind,
    #[serde(rename = "rtpParameters")]
    pub rtp_parameters: Value,
    #[serde(rename = "transportOptions")]
    pub transport_options: Value,
    #[serde(rename = "participantId")]
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProducerClosedData {
    #[serde(rename = "producerId")]
    pub producer_id: String,
    #[serde(rename = "participantId")]
    pub participant_id: ParticipantId,
}

#[derive(Debug, Clone, Serialize)]
pub struct NicknameChangeData {
    #[serde(rename = "participantId")]
    pub participant_id: ParticipantId,
    pub nickname: String,
    #[serde(rename = "previousName")]
    pub previous_name: Option<String>,
    #[serde(rename = "isLocalChange")]
    pub is_local_change: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParticipantKilledData {
    #[serde(rename = "participantId")]
    pub participant_id: ParticipantId,
    pub killed: bool,
}

impl Serialize for ParticipantId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_ref())
    }
}
