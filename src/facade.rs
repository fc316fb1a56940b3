//! The sole dependency this crate has on the media engine.
//!
//! The real implementation is backed by the `mediasoup` crate: a worker
//! pool, one router per room (so no single room's codec/bandwidth
//! accounting caps every other room), and per-participant WebRTC
//! transports. The coordinator depends on the `SfuFacade` trait, not on
//! `MediasoupFacade` directly, so tests substitute an in-memory fake
//! instead of spawning real worker subprocesses.

use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroU8};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use mediasoup::consumer::{Consumer, ConsumerId};
use mediasoup::data_structures::{ListenInfo, Protocol};
use mediasoup::producer::{Producer, ProducerId, ProducerOptions};
use mediasoup::router::{Router, RouterOptions};
use mediasoup::rtp_parameters::{
    MimeTypeAudio, MimeTypeVideo, RtcpFeedback, RtpCodecCapability, RtpCodecParametersParameters,
    RtpParameters,
};
use mediasoup::webrtc_transport::{
    WebRtcTransport, WebRtcTransportListenInfos, WebRtcTransportOptions,
    WebRtcTransportRemoteParameters,
};
use mediasoup::worker::{Worker, WorkerSettings};
use mediasoup::worker_manager::WorkerManager;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::CoreError;
use crate::id_types::{ParticipantId, RoomId};
use crate::metrics;
use crate::protocol::MediaKind;

/// Grace period between logging a dead worker and exiting the process, so
/// the final log line has a chance to flush before the supervisor restarts.
const WORKER_DEATH_GRACE: std::time::Duration = std::time::Duration::from_secs(2);

/// The ICE/DTLS/transport-id bundle returned when a send or receive
/// transport is created, shaped the way the client's mediasoup-client
/// library expects `transportOptions` to look.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TransportDescriptor {
    pub id: String,
    #[serde(rename = "iceParameters")]
    pub ice_parameters: Value,
    #[serde(rename = "iceCandidates")]
    pub ice_candidates: Value,
    #[serde(rename = "dtlsParameters")]
    pub dtls_parameters: Value,
}

/// Result of a successful `consume` call.
#[derive(Debug, Clone)]
pub struct ConsumeOutcome {
    pub consumer_id: String,
    pub producer_id: String,
    pub kind: MediaKind,
    pub rtp_parameters: Value,
}

/// The codec table advertised by every router this process creates:
/// VP8, VP9, two H.264 profiles, and stereo Opus at 48 kHz, each with an
/// `x-google-start-bitrate` hint of 1000 for the video codecs.
pub fn media_codecs() -> Vec<RtpCodecCapability> {
    vec![
        RtpCodecCapability::Audio {
            mime_type: MimeTypeAudio::Opus,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(48000).unwrap(),
            channels: NonZeroU8::new(2).unwrap(),
            parameters: RtpCodecParametersParameters::default(),
            rtcp_feedback: vec![RtcpFeedback::TransportCc],
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::Vp8,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: start_bitrate_params(),
            rtcp_feedback: video_rtcp_feedback(),
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::Vp9,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: start_bitrate_params(),
            rtcp_feedback: video_rtcp_feedback(),
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::H264,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: h264_params("42e01f"),
            rtcp_feedback: video_rtcp_feedback(),
        },
        RtpCodecCapability::Video {
            mime_type: MimeTypeVideo::H264,
            preferred_payload_type: None,
            clock_rate: NonZeroU32::new(90000).unwrap(),
            parameters: h264_params("4d0032"),
            rtcp_feedback: video_rtcp_feedback(),
        },
    ]
}

fn start_bitrate_params() -> RtpCodecParametersParameters {
    let mut params = RtpCodecParametersParameters::default();
    params.insert("x-google-start-bitrate".to_string(), 1000u32.into());
    params
}

fn h264_params(profile_level_id: &str) -> RtpCodecParametersParameters {
    let mut params = start_bitrate_params();
    params.insert(
        "packetization-mode".to_string(),
        1u32.into(),
    );
    params.insert(
        "level-asymmetry-allowed".to_string(),
        1u32.into(),
    );
    params.insert(
        "profile-level-id".to_string(),
        profile_level_id.to_string().into(),
    );
    params
}

fn video_rtcp_feedback() -> Vec<RtcpFeedback> {
    vec![
        RtcpFeedback::Nack,
        RtcpFeedback::NackPli,
        RtcpFeedback::CcmFir,
        RtcpFeedback::GoogRemb,
        RtcpFeedback::TransportCc,
    ]
}

/// The operations the room coordinator performs against the media engine.
#[async_trait]
pub trait SfuFacade: Send + Sync {
    /// Spawns the worker pool. Fatal if it fails; callers should treat an
    /// `Err` here as a process-startup failure, not a recoverable one.
    async fn init(&self) -> Result<(), CoreError>;

    /// Ensures a router exists for `room_id` and returns its RTP
    /// capabilities, so repeated calls for the same room are idempotent.
    async fn router_rtp_capabilities(&self, room_id: &RoomId) -> Result<Value, CoreError>;

    async fn create_send_transport(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<TransportDescriptor, CoreError>;

    /// Idempotent in `participant_id`: a second call for the same
    /// participant returns the same transport.
    async fn create_recv_transport(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<TransportDescriptor, CoreError>;

    async fn connect_transport(
        &self,
        transport_id: &str,
        dtls_parameters: Value,
    ) -> Result<(), CoreError>;

    async fn produce(
        &self,
        transport_id: &str,
        kind: MediaKind,
        rtp_parameters: Value,
    ) -> Result<String, CoreError>;

    async fn consume(
        &self,
        participant_id: &ParticipantId,
        producer_id: &str,
        rtp_capabilities: Value,
    ) -> Result<ConsumeOutcome, CoreError>;

    /// Closes the producer and every consumer downstream of it. Silent if
    /// the producer id is unknown.
    async fn close_producer(&self, producer_id: &str);

    /// Closes all consumers, the send transport, and the receive
    /// transport belonging to `participant_id`; forgets all per-participant
    /// state. Silent if the participant is unknown.
    async fn remove_participant(&self, participant_id: &ParticipantId);

    /// Tears down all transports, producers, and consumers, then closes
    /// every worker.
    async fn shutdown(&self);
}

struct RoomMedia {
    router: Router,
}

struct ParticipantMedia {
    send_transport: Option<WebRtcTransport>,
    recv_transport: Option<WebRtcTransport>,
    /// Consumers this participant created on its receive transport, so
    /// `remove_participant` can close them instead of leaking them.
    consumer_ids: Vec<(ProducerId, ConsumerId)>,
}

/// The `mediasoup`-backed facade implementation.
pub struct MediasoupFacade {
    worker_manager: WorkerManager,
    workers: tokio::sync::Mutex<Vec<Worker>>,
    sfu_workers: usize,
    rtc_port_range: std::ops::RangeInclusive<u16>,
    listen_ip: IpAddr,
    announced_ip: Option<String>,
    rooms: DashMap<RoomId, RoomMedia>,
    participants: DashMap<ParticipantId, ParticipantMedia>,
    producers: DashMap<ProducerId, Producer>,
    consumers: DashMap<ConsumerId, Consumer>,
    consumers_by_producer: DashMap<ProducerId, Vec<ConsumerId>>,
    next_worker: std::sync::atomic::AtomicUsize,
}

impl MediasoupFacade {
    pub fn new(config: &Config) -> Self {
        Self {
            worker_manager: WorkerManager::new(),
            workers: tokio::sync::Mutex::new(Vec::new()),
            sfu_workers: config.sfu_workers,
            rtc_port_range: config.rtc_min_port..=config.rtc_max_port,
            listen_ip: "0.0.0.0".parse().unwrap(),
            announced_ip: config.announced_ip.clone(),
            rooms: DashMap::new(),
            participants: DashMap::new(),
            producers: DashMap::new(),
            consumers: DashMap::new(),
            consumers_by_producer: DashMap::new(),
            next_worker: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    async fn pick_worker(&self) -> Result<Worker, CoreError> {
        let workers = self.workers.lock().await;
        if workers.is_empty() {
            return Err(CoreError::facade("worker pool not initialized"));
        }
        let idx = self
            .next_worker
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
            % workers.len();
        Ok(workers[idx].clone())
    }

    async fn ensure_router(&self, room_id: &RoomId) -> Result<Router, CoreError> {
        if let Some(room) = self.rooms.get(room_id) {
            return Ok(room.router.clone());
        }
        let worker = self.pick_worker().await?;
        let router = worker
            .create_router(RouterOptions::new(media_codecs()))
            .await
            .map_err(|e| CoreError::facade(format!("failed to create router: {e}")))?;
        self.rooms.insert(
            room_id.clone(),
            RoomMedia {
                router: router.clone(),
            },
        );
        Ok(router)
    }

    /// Builds a fresh UDP+TCP `WebRtcTransportListenInfos` from the
    /// configured bind/announced address. A new `WebRtcTransportOptions` is
    /// built per transport since `create_webrtc_transport` consumes it.
    fn listen_infos(&self) -> WebRtcTransportListenInfos {
        let udp_info = ListenInfo {
            protocol: Protocol::Udp,
            ip: self.listen_ip,
            announced_address: self.announced_ip.clone(),
            port: None,
            port_range: None,
            flags: None,
            send_buffer_size: None,
            recv_buffer_size: None,
            expose_internal_ip: false,
        };
        let tcp_info = ListenInfo {
            protocol: Protocol::Tcp,
            ip: self.listen_ip,
            announced_address: self.announced_ip.clone(),
            port: None,
            port_range: None,
            flags: None,
            send_buffer_size: None,
            recv_buffer_size: None,
            expose_internal_ip: false,
        };
        WebRtcTransportListenInfos::new(udp_info).insert(tcp_info)
    }

    fn transport_options(&self) -> WebRtcTransportOptions {
        let mut options = WebRtcTransportOptions::new(self.listen_infos());
        options.enable_udp = true;
        options.enable_tcp = true;
        options.prefer_udp = true;
        options
    }

    fn descriptor_from(transport: &WebRtcTransport) -> TransportDescriptor {
        TransportDescriptor {
            id: transport.id().to_string(),
            ice_parameters: serde_json::to_value(transport.ice_parameters())
                .unwrap_or(Value::Null),
            ice_candidates: serde_json::to_value(transport.ice_candidates())
                .unwrap_or(Value::Null),
            dtls_parameters: serde_json::to_value(transport.dtls_parameters())
                .unwrap_or(Value::Null),
        }
    }
}

#[async_trait]
impl SfuFacade for MediasoupFacade {
    async fn init(&self) -> Result<(), CoreError> {
        let mut workers = self.workers.lock().await;
        for _ in 0..self.sfu_workers.max(1) {
            let mut settings = WorkerSettings::default();
            settings.rtc_port_range = self.rtc_port_range.clone();

            let worker = self
                .worker_manager
                .create_worker(settings)
                .await
                .map_err(|e| CoreError::facade(format!("failed to spawn sfu worker: {e}")))?;

            let worker_id = worker.id();
            worker
                .on_dead(move |reason| {
                    error!(?reason, %worker_id, "sfu worker died, exiting after grace period");
                    metrics::WORKER_DEATHS_TOTAL.inc();
                    tokio::spawn(async {
                        tokio::time::sleep(WORKER_DEATH_GRACE).await;
                        std::process::exit(1);
                    });
                })
                .detach();

            workers.push(worker);
        }
        info!(count = workers.len(), "sfu worker pool initialized");
        Ok(())
    }

    async fn router_rtp_capabilities(&self, room_id: &RoomId) -> Result<Value, CoreError> {
        let router = self.ensure_router(room_id).await?;
        serde_json::to_value(router.rtp_capabilities())
            .map_err(|e| CoreError::facade(format!("failed to serialize rtp capabilities: {e}")))
    }

    async fn create_send_transport(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<TransportDescriptor, CoreError> {
        let router = self.ensure_router(room_id).await?;
        let transport = router
            .create_webrtc_transport(self.transport_options())
            .await
            .map_err(|e| CoreError::facade(format!("failed to create send transport: {e}")))?;
        let descriptor = Self::descriptor_from(&transport);

        self.participants
            .entry(participant_id.clone())
            .and_modify(|p| p.send_transport = Some(transport.clone()))
            .or_insert(ParticipantMedia {
                send_transport: Some(transport),
                recv_transport: None,
                consumer_ids: Vec::new(),
            });

        Ok(descriptor)
    }

    async fn create_recv_transport(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<TransportDescriptor, CoreError> {
        if let Some(p) = self.participants.get(participant_id) {
            if let Some(existing) = &p.recv_transport {
                return Ok(Self::descriptor_from(existing));
            }
        }

        let router = self.ensure_router(room_id).await?;
        let transport = router
            .create_webrtc_transport(self.transport_options())
            .await
            .map_err(|e| CoreError::facade(format!("failed to create recv transport: {e}")))?;
        let descriptor = Self::descriptor_from(&transport);

        self.participants
            .entry(participant_id.clone())
            .and_modify(|p| p.recv_transport = Some(transport.clone()))
            .or_insert(ParticipantMedia {
                send_transport: None,
                recv_transport: Some(transport),
                consumer_ids: Vec::new(),
            });

        Ok(descriptor)
    }

    async fn connect_transport(
        &self,
        transport_id: &str,
        dtls_parameters: Value,
    ) -> Result<(), CoreError> {
        let dtls_parameters = serde_json::from_value(dtls_parameters)
            .map_err(|e| CoreError::protocol(format!("invalid dtlsParameters: {e}")))?;

        for entry in self.participants.iter() {
            for transport in [&entry.send_transport, &entry.recv_transport]
                .into_iter()
                .flatten()
            {
                if transport.id().to_string() == transport_id {
                    transport
                        .connect(WebRtcTransportRemoteParameters { dtls_parameters })
                        .await
                        .map_err(|e| CoreError::facade(format!("connect failed: {e}")))?;
                    return Ok(());
                }
            }
        }
        Err(CoreError::facade(format!(
            "no transport with id {transport_id}"
        )))
    }

    async fn produce(
        &self,
        transport_id: &str,
        kind: MediaKind,
        rtp_parameters: Value,
    ) -> Result<String, CoreError> {
        let rtp_parameters: RtpParameters = serde_json::from_value(rtp_parameters)
            .map_err(|e| CoreError::protocol(format!("invalid rtpParameters: {e}")))?;
        let media_kind = match kind {
            MediaKind::Audio => mediasoup::rtp_parameters::MediaKind::Audio,
            MediaKind::Video => mediasoup::rtp_parameters::MediaKind::Video,
        };

        let transport = self
            .participants
            .iter()
            .find_map(|entry| {
                [&entry.send_transport, &entry.recv_transport]
                    .into_iter()
                    .flatten()
                    .find(|t| t.id().to_string() == transport_id)
                    .cloned()
            })
            .ok_or_else(|| CoreError::facade(format!("no transport with id {transport_id}")))?;

        let producer = transport
            .produce(ProducerOptions::new(media_kind, rtp_parameters))
            .await
            .map_err(|e| CoreError::facade(format!("produce failed: {e}")))?;

        let id = producer.id().to_string();
        metrics::ACTIVE_PRODUCERS.inc();
        self.producers.insert(producer.id(), producer);
        Ok(id)
    }

    async fn consume(
        &self,
        participant_id: &ParticipantId,
        producer_id: &str,
        rtp_capabilities: Value,
    ) -> Result<ConsumeOutcome, CoreError> {
        let producer_id: ProducerId = producer_id
            .parse()
            .map_err(|_| CoreError::facade("malformed producer id"))?;

        if !self.producers.contains_key(&producer_id) {
            return Err(CoreError::facade(format!(
                "producer {producer_id} is gone"
            )));
        }

        let rtp_capabilities = serde_json::from_value(rtp_capabilities)
            .map_err(|e| CoreError::protocol(format!("invalid rtpCapabilities: {e}")))?;

        let recv_transport = self
            .participants
            .get(participant_id)
            .and_then(|p| p.recv_transport.clone())
            .ok_or_else(|| CoreError::facade("no receive transport for participant"))?;

        let consumer = recv_transport
            .consume(mediasoup::consumer::ConsumerOptions::new(
                producer_id,
                rtp_capabilities,
            ))
            .await
            .map_err(|e| CoreError::facade(format!("cannot consume: {e}")))?;

        let kind = match consumer.kind() {
            mediasoup::rtp_parameters::MediaKind::Audio => MediaKind::Audio,
            mediasoup::rtp_parameters::MediaKind::Video => MediaKind::Video,
        };

        let outcome = ConsumeOutcome {
            consumer_id: consumer.id().to_string(),
            producer_id: consumer.producer_id().to_string(),
            kind,
            rtp_parameters: serde_json::to_value(consumer.rtp_parameters())
                .unwrap_or(Value::Null),
        };

        metrics::ACTIVE_CONSUMERS.inc();
        self.consumers_by_producer
            .entry(producer_id)
            .or_default()
            .push(consumer.id());
        if let Some(mut media) = self.participants.get_mut(participant_id) {
            media.consumer_ids.push((producer_id, consumer.id()));
        }
        self.consumers.insert(consumer.id(), consumer);

        Ok(outcome)
    }

    async fn close_producer(&self, producer_id: &str) {
        let Ok(id): Result<ProducerId, _> = producer_id.parse() else {
            warn!(producer_id, "close_producer called with malformed id");
            return;
        };
        if let Some((_, consumer_ids)) = self.consumers_by_producer.remove(&id) {
            for consumer_id in consumer_ids {
                if let Some((_, consumer)) = self.consumers.remove(&consumer_id) {
                    consumer.close();
                    metrics::ACTIVE_CONSUMERS.dec();
                }
            }
        }
        if let Some((_, producer)) = self.producers.remove(&id) {
            producer.close();
            metrics::ACTIVE_PRODUCERS.dec();
        }
    }

    async fn remove_participant(&self, participant_id: &ParticipantId) {
        if let Some((_, media)) = self.participants.remove(participant_id) {
            for (producer_id, consumer_id) in media.consumer_ids {
                if let Some((_, consumer)) = self.consumers.remove(&consumer_id) {
                    consumer.close();
                    metrics::ACTIVE_CONSUMERS.dec();
                }
                if let Some(mut ids) = self.consumers_by_producer.get_mut(&producer_id) {
                    ids.retain(|id| *id != consumer_id);
                }
            }
            if let Some(t) = media.send_transport {
                drop(t);
            }
            if let Some(t) = media.recv_transport {
                drop(t);
            }
        }
    }

    async fn shutdown(&self) {
        self.consumers.clear();
        self.consumers_by_producer.clear();
        self.producers.clear();
        self.participants.clear();
        self.rooms.clear();
        let mut workers = self.workers.lock().await;
        for worker in workers.drain(..) {
            worker.close();
        }
        info!("sfu facade shut down");
    }
}

/// An in-memory facade used by the room coordinator's own tests and by any
/// test that needs a room-coordinator instance without a real mediasoup
/// worker process. It honors the same contract (ids are unique, consume
/// fails once a producer is closed, idempotent receive transports).
pub struct InMemoryFacade {
    next_id: std::sync::atomic::AtomicU64,
    producers: DashMap<String, (ParticipantId, MediaKind)>,
    recv_transports: DashMap<ParticipantId, String>,
    send_transports: DashMap<ParticipantId, String>,
    pub closed_producers: DashMap<String, ()>,
    pub removed_participants: DashMap<ParticipantId, ()>,
    pub room_routers: DashMap<RoomId, ()>,
}

impl Default for InMemoryFacade {
    fn default() -> Self {
        Self {
            next_id: std::sync::atomic::AtomicU64::new(1),
            producers: DashMap::new(),
            recv_transports: DashMap::new(),
            send_transports: DashMap::new(),
            closed_producers: DashMap::new(),
            removed_participants: DashMap::new(),
            room_routers: DashMap::new(),
        }
    }
}

impl InMemoryFacade {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        format!("{prefix}-{n}")
    }
}

#[async_trait]
impl SfuFacade for InMemoryFacade {
    async fn init(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn router_rtp_capabilities(&self, room_id: &RoomId) -> Result<Value, CoreError> {
        self.room_routers.insert(room_id.clone(), ());
        Ok(serde_json::json!({ "codecs": [] }))
    }

    async fn create_send_transport(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<TransportDescriptor, CoreError> {
        self.router_rtp_capabilities(room_id).await?;
        let id = self.next("send-transport");
        self.send_transports.insert(participant_id.clone(), id.clone());
        Ok(TransportDescriptor {
            id,
            ice_parameters: Value::Null,
            ice_candidates: Value::Null,
            dtls_parameters: Value::Null,
        })
    }

    async fn create_recv_transport(
        &self,
        room_id: &RoomId,
        participant_id: &ParticipantId,
    ) -> Result<TransportDescriptor, CoreError> {
        self.router_rtp_capabilities(room_id).await?;
        if let Some(existing) = self.recv_transports.get(participant_id) {
            return Ok(TransportDescriptor {
                id: existing.clone(),
                ice_parameters: Value::Null,
                ice_candidates: Value::Null,
                dtls_parameters: Value::Null,
            });
        }
        let id = self.next("recv-transport");
        self.recv_transports.insert(participant_id.clone(), id.clone());
        Ok(TransportDescriptor {
            id,
            ice_parameters: Value::Null,
            ice_candidates: Value::Null,
            dtls_parameters: Value::Null,
        })
    }

    async fn connect_transport(
        &self,
        _transport_id: &str,
        _dtls_parameters: Value,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    async fn produce(
        &self,
        _transport_id: &str,
        kind: MediaKind,
        _rtp_parameters: Value,
    ) -> Result<String, CoreError> {
        let id = self.next("producer");
        // Caller is expected to associate the producer with its owner via
        // `consume`'s bookkeeping; for the fake we don't know the owning
        // participant here, so `consume` looks the producer up by id only.
        self.producers
            .insert(id.clone(), (ParticipantId::from("unknown"), kind));
        Ok(id)
    }

    async fn consume(
        &self,
        participant_id: &ParticipantId,
        producer_id: &str,
        _rtp_capabilities: Value,
    ) -> Result<ConsumeOutcome, CoreError> {
        if !self.recv_transports.contains_key(participant_id) {
            return Err(CoreError::facade("no receive transport for participant"));
        }
        let (_, kind) = self
            .producers
            .get(producer_id)
            .map(|e| *e.value())
            .ok_or_else(|| CoreError::facade(format!("producer {producer_id} is gone")))?;

        Ok(ConsumeOutcome {
            consumer_id: self.next("consumer"),
            producer_id: producer_id.to_string(),
            kind,
            rtp_parameters: Value::Null,
        })
    }

    async fn close_producer(&self, producer_id: &str) {
        self.producers.remove(producer_id);
        self.closed_producers.insert(producer_id.to_string(), ());
    }

    async fn remove_participant(&self, participant_id: &ParticipantId) {
        self.recv_transports.remove(participant_id);
        self.send_transports.remove(participant_id);
        self.removed_participants.insert(participant_id.clone(), ());
    }

    async fn shutdown(&self) {
        self.producers.clear();
        self.recv_transports.clear();
        self.send_transports.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_codecs_has_expected_entries() {
        let codecs = media_codecs();
        assert_eq!(codecs.len(), 5);
    }

    #[tokio::test]
    async fn test_in_memory_facade_recv_transport_is_idempotent() {
        let facade = InMemoryFacade::new();
        let room = RoomId::from("r1");
        let pid = ParticipantId::from("user-1");
        let a = facade.create_recv_transport(&room, &pid).await.unwrap();
        let b = facade.create_recv_transport(&room, &pid).await.unwrap();
        assert_eq!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_in_memory_facade_consume_fails_after_close() {
        let facade = InMemoryFacade::new();
        let room = RoomId::from("r1");
        let producer_owner = ParticipantId::from("user-a");
        let consumer = ParticipantId::from("user-b");

        facade
            .create_send_transport(&room, &producer_owner)
            .await
            .unwrap();
        let producer_id = facade
            .produce("send-transport-1", MediaKind::Video, Value::Null)
            .await
            .unwrap();

        facade.create_recv_transport(&room, &consumer).await.unwrap();
        facade.close_producer(&producer_id).await;

        let result = facade.consume(&consumer, &producer_id, Value::Null).await;
        assert!(result.is_err());
    }
}
