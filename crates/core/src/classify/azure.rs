use crate::classify::parse::{parse_classification, parse_presence};
use crate::classify::{Classification, ClassifyError, FrameClassifier, PresenceCheck};
use crate::config::AzureConfig;
use crate::frames::FrameImage;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(120);
const PRESENCE_TIMEOUT: Duration = Duration::from_secs(60);
const PRESENCE_MAX_TOKENS: u32 = 50;

const CLASSIFY_SYSTEM_PROMPT: &str = "Classify a single video frame as exactly one of: A-roll, B-roll, C-roll.\n\
Definitions:\n\
- A-roll: primary narrative track: person facing camera (talking head), narrator, vlog. Indicators: visible face, likely speaking, addressing viewer.\n\
- B-roll: supporting visuals without a speaking face: screen/UI/phone, product close-ups, scenery, cutaways, captions on plain background.\n\
- C-roll: very short decorative inserts (memes/reactions/micro-cutaways/motion design).\n\
If a smartphone UI or interface dominates the frame, prefer B-roll.\n\
Also estimate which share of the frame is occupied by the on-camera speaker (a_role_ratio) and by supporting content (b_role_ratio); the two should roughly sum to 1.\n\
Respond ONLY with strict JSON: {\"role\": \"A-roll|B-roll|C-roll\", \"confidence\": number 0..1, \"explanation\": \"short reason\", \"a_role_ratio\": number 0..1, \"b_role_ratio\": number 0..1}.";

const CLASSIFY_USER_PROMPT: &str =
    "Classify this frame and include a one-sentence explanation in JSON only.";

const PRESENCE_PROMPT: &str = "Analyze this video frame. Is there a person speaking to the camera (talking head / A-roll) visible?\n\n\
Respond ONLY with JSON:\n\
{\n    \"has_talking_head\": true/false\n}";

/// Chat-completions vision client for an Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureVisionClient {
    client: Client,
    config: AzureConfig,
}

impl AzureVisionClient {
    pub fn new(config: AzureConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn chat(
        &self,
        messages: Vec<ChatMessage<'_>>,
        max_tokens: Option<u32>,
        timeout: Duration,
    ) -> Result<String, ClassifyError> {
        let request = ChatRequest {
            model: self.config.deployment.as_str(),
            messages,
            temperature: 0.0,
            max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(self.config.chat_completions_url())
            .header("api-key", self.config.api_key.expose())
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClassifyError::HttpStatus(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ClassifyError::InvalidResponse(format!("Failed to parse JSON: {e}")))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ClassifyError::InvalidResponse("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_else(|| "{}".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'static str>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

fn classify_messages(image: &FrameImage) -> Vec<ChatMessage<'_>> {
    vec![
        ChatMessage {
            role: "system",
            content: vec![ContentPart::Text {
                text: CLASSIFY_SYSTEM_PROMPT,
            }],
        },
        ChatMessage {
            role: "user",
            content: vec![
                ContentPart::Text {
                    text: CLASSIFY_USER_PROMPT,
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: &image.data_uri,
                        detail: Some("high"),
                    },
                },
            ],
        },
    ]
}

fn presence_messages(image: &FrameImage) -> Vec<ChatMessage<'_>> {
    vec![ChatMessage {
        role: "user",
        content: vec![
            ContentPart::Text {
                text: PRESENCE_PROMPT,
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: &image.data_uri,
                    detail: None,
                },
            },
        ],
    }]
}

impl FrameClassifier for AzureVisionClient {
    fn classify<'a>(
        &'a self,
        image: &'a FrameImage,
    ) -> BoxFuture<'a, Result<Classification, ClassifyError>> {
        async move {
            let content = self
                .chat(classify_messages(image), None, CLASSIFY_TIMEOUT)
                .await?;
            let classification = parse_classification(&content);
            tracing::debug!(
                frame = %image.name,
                role = %classification.role,
                confidence = classification.confidence,
                "frame classified"
            );
            Ok(classification)
        }
        .boxed()
    }
}

impl PresenceCheck for AzureVisionClient {
    fn has_talking_head<'a>(
        &'a self,
        image: &'a FrameImage,
    ) -> BoxFuture<'a, Result<bool, ClassifyError>> {
        async move {
            let content = self
                .chat(
                    presence_messages(image),
                    Some(PRESENCE_MAX_TOKENS),
                    PRESENCE_TIMEOUT,
                )
                .await?;
            Ok(parse_presence(&content))
        }
        .boxed()
    }
}
