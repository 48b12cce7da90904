//! WebRTC media for the agent through the LiveKit client SDK.
//!
//! Subscribed remote audio tracks are resampled to
//! [`AGENT_INPUT_SAMPLE_RATE`] mono and forwarded as [`InboundAudio`];
//! agent replies are captured into a published local microphone track.

use async_trait::async_trait;
use futures_util::StreamExt;
use livekit::options::TrackPublishOptions;
use livekit::prelude::*;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_stream::native::NativeAudioStream;
use livekit::webrtc::prelude::{AudioFrame, AudioSourceOptions, RtcAudioSource};
use parley_voice::vad::pcm_bytes;
use parley_voice::{AudioSink, InboundAudio, RoomHandle, VoiceError, AGENT_INPUT_SAMPLE_RATE};
use std::sync::Arc;
use tokio::sync::mpsc;

const AGENT_TRACK_NAME: &str = "agent-voice";
/// Matches the PCM the OpenAI speech client returns.
const OUTPUT_SAMPLE_RATE: u32 = 24_000;
const OUTPUT_QUEUE_MS: u32 = 1_000;
const INBOUND_CHANNEL_CAPACITY: usize = 256;

fn rtc_error(e: impl std::fmt::Display) -> VoiceError {
    VoiceError::RoomService(e.to_string())
}

/// Publishes agent speech into the room's local audio track.
struct TrackSink {
    source: NativeAudioSource,
}

#[async_trait]
impl AudioSink for TrackSink {
    async fn publish(&self, pcm: &[u8], sample_rate: u32) -> Result<(), VoiceError> {
        if sample_rate != OUTPUT_SAMPLE_RATE {
            return Err(VoiceError::Config(format!(
                "agent track expects {OUTPUT_SAMPLE_RATE} Hz audio, got {sample_rate} Hz"
            )));
        }

        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        // 10 ms frames.
        for chunk in samples.chunks((sample_rate / 100) as usize) {
            let frame = AudioFrame {
                data: chunk.into(),
                sample_rate,
                num_channels: 1,
                samples_per_channel: chunk.len() as u32,
            };
            self.source.capture_frame(&frame).await.map_err(rtc_error)?;
        }
        Ok(())
    }
}

/// A live connection to the LiveKit SFU.
pub struct LiveKitTransport {
    room: Room,
}

impl LiveKitTransport {
    /// Connects to the room, publishes the agent track and starts
    /// forwarding remote audio.
    pub async fn join(
        handle: RoomHandle,
        url: &str,
        token: &str,
    ) -> Result<(RoomHandle, Self, mpsc::Receiver<InboundAudio>), VoiceError> {
        let mut options = RoomOptions::default();
        options.auto_subscribe = handle.auto_subscribe().subscribes_on_publish();

        let (room, mut events) = Room::connect(url, token, options)
            .await
            .map_err(rtc_error)?;
        tracing::info!(room = handle.room_name(), "joined LiveKit room");

        let source = NativeAudioSource::new(
            AudioSourceOptions::default(),
            OUTPUT_SAMPLE_RATE,
            1,
            OUTPUT_QUEUE_MS,
        );
        let track = LocalAudioTrack::create_audio_track(
            AGENT_TRACK_NAME,
            RtcAudioSource::Native(source.clone()),
        );
        room.local_participant()
            .publish_track(
                LocalTrack::Audio(track),
                TrackPublishOptions {
                    source: TrackSource::Microphone,
                    ..Default::default()
                },
            )
            .await
            .map_err(rtc_error)?;

        let (tx, rx) = mpsc::channel(INBOUND_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let RoomEvent::TrackSubscribed {
                    track: RemoteTrack::Audio(audio),
                    participant,
                    ..
                } = event
                {
                    let speaker = participant.identity().0.clone();
                    tracing::info!(%speaker, "subscribed to participant audio");
                    tokio::spawn(forward_track(audio, speaker, tx.clone()));
                }
            }
        });

        let handle = handle.with_sink(Arc::new(TrackSink { source }));
        Ok((handle, Self { room }, rx))
    }

    pub async fn close(self) {
        if let Err(e) = self.room.close().await {
            tracing::warn!(error = %e, "error closing LiveKit room");
        }
    }
}

async fn forward_track(track: RemoteAudioTrack, speaker: String, tx: mpsc::Sender<InboundAudio>) {
    let mut stream = NativeAudioStream::new(track.rtc_track(), AGENT_INPUT_SAMPLE_RATE as i32, 1);

    while let Some(frame) = stream.next().await {
        let chunk = InboundAudio {
            speaker: speaker.clone(),
            sample_rate: frame.sample_rate,
            pcm: pcm_bytes(&frame.data),
        };
        if tx.send(chunk).await.is_err() {
            break;
        }
    }

    tracing::debug!(%speaker, "participant audio ended");
}
