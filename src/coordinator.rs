//! Room Coordinator: the state machine per participant. This is where
//! JOIN's two-phase handshake, the fan-out rules, and disconnect cleanup
//! all live.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::facade::SfuFacade;
use crate::id_types::{ParticipantId, RoomId};
use crate::protocol::{
    ClientMessage, ConsumeResponseData, MediaKind, NewProducerData, NicknameChangeData,
    ParticipantKilledData, ProduceResponseData, ProducerClosedData, ServerMessage, WelcomeData,
};
use crate::room::{Participant, RoomRegistry, SessionState};

pub struct RoomCoordinator<F: SfuFacade> {
    registry: Arc<RoomRegistry>,
    facade: Arc<F>,
}

impl<F: SfuFacade> RoomCoordinator<F> {
    pub fn new(registry: Arc<RoomRegistry>, facade: Arc<F>) -> Self {
        Self { registry, facade }
    }

    /// Parses one inbound frame and routes it to the matching handler.
    /// Malformed frames and unknown types are logged and elicit a single
    /// `error` reply; they never close the session.
    pub async fn dispatch(&self, participant: &Arc<Participant>, raw: &str) {
        *participant.last_activity.lock().await = Instant::now();
        participant.touch();

        let message: ClientMessage = match serde_json::from_str(raw) {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "malformed or unknown signaling frame");
                participant.send(&ServerMessage::Error {
                    error: format!("malformed message: {e}"),
                });
                return;
            }
        };

        let result = match message {
            ClientMessage::Join {
                room_id,
                rtp_capabilities,
            } => self.handle_join(participant, room_id, rtp_capabilities).await,
            ClientMessage::Leave => {
                self.handle_disconnect(participant).await;
                Ok(())
            }
            ClientMessage::ConnectTransport {
                transport_id,
                dtls_parameters,
            } => self.handle_connect_transport(transport_id, dtls_parameters).await,
            ClientMessage::Produce {
                transport_id,
                kind,
                rtp_parameters,
            } => {
                self.handle_produce(participant, transport_id, kind, rtp_parameters)
                    .await
            }
            ClientMessage::RequestConsume {
                producer_id,
                rtp_capabilities,
            } => {
                self.handle_request_consume(participant, producer_id, rtp_capabilities)
                    .await
            }
            ClientMessage::NicknameChange {
                nickname,
                previous_name,
            } => {
                self.handle_nickname_change(participant, nickname, previous_name)
                    .await
            }
            ClientMessage::ParticipantKilled { killed } => {
                self.handle_participant_killed(participant, killed).await
            }
            ClientMessage::Ping => {
                participant.send(&ServerMessage::Pong);
                Ok(())
            }
        };

        if let Err(e) = result {
            participant.send(&ServerMessage::Error {
                error: e.to_string(),
            });
        }
    }

    async fn handle_join(
        &self,
        participant: &Arc<Participant>,
        room_id: Option<String>,
        rtp_capabilities: Option<serde_json::Value>,
    ) -> Result<(), crate::error::CoreError> {
        let state = participant.state().await;

        match (state, rtp_capabilities) {
            // First JOIN: attach to the room, allocate the send transport,
            // reply with welcome. No fan-out: the newcomer cannot consume
            // until its own capabilities are known.
            (SessionState::Opened, None) => {
                let room_id = room_id
                    .map(RoomId::from)
                    .unwrap_or_default();
                let room = self.registry.get_or_create(&room_id);

                *participant.room_id.lock().await = room_id.clone();
                room.attach(participant.clone()).await;
                participant.set_state(SessionState::Joining).await;

                let router_caps = self.facade.router_rtp_capabilities(&room_id).await?;
                let transport = self
                    .facade
                    .create_send_transport(&room_id, &participant.id)
                    .await?;

                participant.send(&ServerMessage::Welcome {
                    data: WelcomeData {
                        router_rtp_capabilities: router_caps,
                        web_rtc_transport_options: serde_json::to_value(&transport)
                            .unwrap_or(serde_json::Value::Null),
                    },
                });
                Ok(())
            }

            // Second JOIN: capabilities now known. Fan out existing
            // producers (and killed flags) to the newcomer, in the order
            // P1 requires: every producer that exists at the moment of
            // this transition, exactly once.
            (SessionState::Joining, Some(caps)) => {
                *participant.rtp_capabilities.lock().await = Some(caps);
                participant.set_state(SessionState::Active).await;

                let room_id = participant.room_id.lock().await.clone();
                let room = self
                    .registry
                    .get(&room_id)
                    .ok_or_else(|| crate::error::CoreError::protocol("room vanished mid-join"))?;

                for other in room.snapshot_members().await {
                    if other.id == participant.id {
                        continue;
                    }
                    if let Some(producer_id) = other.producer_id.lock().await.clone() {
                        participant.send(&ServerMessage::NewProducer {
                            data: NewProducerData {
                                producer_id,
                                participant_id: other.id.clone(),
                            },
                        });
                        if other.is_killed.load(std::sync::atomic::Ordering::SeqCst) {
                            participant.send(&ServerMessage::ParticipantKilled {
                                data: ParticipantKilledData {
                                    participant_id: other.id.clone(),
                                    killed: true,
                                },
                            });
                        }
                    }
                }
                Ok(())
            }

            (SessionState::Active, None) => Err(crate::error::CoreError::protocol(
                "already joined; a second JOIN without capabilities is invalid",
            )),
            (SessionState::Opened, Some(_)) => Err(crate::error::CoreError::protocol(
                "cannot declare capabilities before the first JOIN completes",
            )),
            _ => Err(crate::error::CoreError::protocol(
                "JOIN received in an invalid session state",
            )),
        }
    }

    async fn handle_produce(
        &self,
        participant: &Arc<Participant>,
        transport_id: String,
        kind: MediaKind,
        rtp_parameters: serde_json::Value,
    ) -> Result<(), crate::error::CoreError> {
        if participant.state().await != SessionState::Active {
            return Err(crate::error::CoreError::protocol("Not in a room"));
        }

        let producer_id = self
            .facade
            .produce(&transport_id, kind, rtp_parameters)
            .await?;
        *participant.producer_id.lock().await = Some(producer_id.clone());

        participant.send(&ServerMessage::ProduceResponse {
            data: ProduceResponseData {
                id: producer_id.clone(),
            },
        });

        let room_id = participant.room_id.lock().await.clone();
        if let Some(room) = self.registry.get(&room_id) {
            for other in room.snapshot_members().await {
                if other.id == participant.id {
                    continue;
                }
                other.send(&ServerMessage::NewProducer {
                    data: NewProducerData {
                        producer_id: producer_id.clone(),
                        participant_id: participant.id.clone(),
                    },
                });
            }
        }
        Ok(())
    }

    async fn handle_request_consume(
        &self,
        participant: &Arc<Participant>,
        producer_id: String,
        rtp_capabilities: serde_json::Value,
    ) -> Result<(), crate::error::CoreError> {
        let room_id = participant.room_id.lock().await.clone();
        let transport = self
            .facade
            .create_recv_transport(&room_id, &participant.id)
            .await?;

        let source_participant_id = self
            .find_producer_owner(&room_id, &producer_id)
            .await
            .unwrap_or_else(|| ParticipantId::from("unknown"));

        match self
            .facade
            .consume(&participant.id, &producer_id, rtp_capabilities)
            .await
        {
            Ok(outcome) => {
                participant.send(&ServerMessage::ConsumeResponse {
                    data: ConsumeResponseData {
                        consumer_id: outcome.consumer_id,
                        producer_id: outcome.producer_id,
                        kind: outcome.kind,
                        rtp_parameters: outcome.rtp_parameters,
                        transport_options: serde_json::to_value(&transport)
                            .unwrap_or(serde_json::Value::Null),
                        participant_id: source_participant_id,
                    },
                });
                Ok(())
            }
            Err(e) => {
                participant.send(&ServerMessage::ProducerClosed {
                    data: ProducerClosedData {
                        producer_id,
                        participant_id: source_participant_id,
                    },
                });
                Err(e)
            }
        }
    }

    async fn handle_connect_transport(
        &self,
        transport_id: String,
        dtls_parameters: serde_json::Value,
    ) -> Result<(), crate::error::CoreError> {
        self.facade
            .connect_transport(&transport_id, dtls_parameters)
            .await
    }

    async fn handle_nickname_change(
        &self,
        participant: &Arc<Participant>,
        nickname: String,
        previous_name: Option<String>,
    ) -> Result<(), crate::error::CoreError> {
        let room_id = participant.room_id.lock().await.clone();
        if let Some(room) = self.registry.get(&room_id) {
            for other in room.snapshot_members().await {
                let is_local_change = other.id == participant.id;
                other.send(&ServerMessage::NicknameChange {
                    data: NicknameChangeData {
                        participant_id: participant.id.clone(),
                        nickname: nickname.clone(),
                        previous_name: previous_name.clone(),
                        is_local_change,
                    },
                });
            }
        }
        Ok(())
    }

    async fn handle_participant_killed(
        &self,
        participant: &Arc<Participant>,
        killed: bool,
    ) -> Result<(), crate::error::CoreError> {
        participant
            .is_killed
            .store(killed, std::sync::atomic::Ordering::SeqCst);

        let room_id = participant.room_id.lock().await.clone();
        if let Some(room) = self.registry.get(&room_id) {
            for other in room.snapshot_members().await {
                if other.id == participant.id {
                    continue;
                }
                other.send(&ServerMessage::ParticipantKilled {
                    data: ParticipantKilledData {
                        participant_id: participant.id.clone(),
                        killed,
                    },
                });
            }
        }
        Ok(())
    }

    /// Shared by client LEAVE, a dead liveness probe, and a raw connection
    /// close — all three converge on the same cleanup.
    pub async fn handle_disconnect(&self, participant: &Arc<Participant>) {
        if participant.state().await == SessionState::Closed {
            return;
        }
        participant.set_state(SessionState::Closing).await;

        let room_id = participant.room_id.lock().await.clone();
        let room = self.registry.get(&room_id);

        if let Some(producer_id) = participant.producer_id.lock().await.take() {
            self.facade.close_producer(&producer_id).await;
            if let Some(room) = &room {
                for other in room.snapshot_members().await {
                    if other.id == participant.id {
                        continue;
                    }
                    other.send(&ServerMessage::ProducerClosed {
                        data: ProducerClosedData {
                            producer_id: producer_id.clone(),
                            participant_id: participant.id.clone(),
                        },
                    });
                }
            }
        }

        if let Some(room) = &room {
            room.detach(&participant.id).await;
            for other in room.snapshot_members().await {
                other.send(&ServerMessage::Disconnect {
                    participant_id: participant.id.clone(),
                });
            }
            self.registry.reap_if_empty(&room_id).await;
        }

        self.facade.remove_participant(&participant.id).await;
        participant.set_state(SessionState::Closed).await;
        info!(participant_id = %participant.id, "participant resources released");
    }

    async fn find_producer_owner(
        &self,
        room_id: &RoomId,
        producer_id: &str,
    ) -> Option<ParticipantId> {
        let room = self.registry.get(room_id)?;
        for member in room.snapshot_members().await {
            if member.producer_id.lock().await.as_deref() == Some(producer_id) {
                return Some(member.id.clone());
            }
        }
        None
    }
}
