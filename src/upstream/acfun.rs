// src/upstream/acfun.rs — HTTP client for the AcFun live endpoints
//
// Listing and cut-info are plain GETs against live.acfun.cn and answer with
// `result == 0` on success. Summary and playback sit behind a visitor token
// on the kuaishouzt gateway, which answers with `result == 1`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::{CutInfo, Session, SnapshotMap, Summary, UpstreamApi};
use crate::infra::config::UpstreamConfig;
use crate::infra::errors::LiveTrackError;

const LIST: &str = "live list";
const CUT_INFO: &str = "cut info";
const VISITOR_LOGIN: &str = "visitor login";
const SUMMARY: &str = "end summary";
const PLAYBACK: &str = "playback";

const LIST_COMPLETE_CURSOR: &str = "no_more";
const CUT_READY_STATUS: i64 = 1;
const ACFUN_OK: i64 = 0;
const GATEWAY_OK: i64 = 1;
const VISITOR_SID: &str = "acfun.api.visitor";

/// Longest response excerpt carried inside an error.
const BODY_EXCERPT_CHARS: usize = 300;

pub struct AcFunClient {
    client: reqwest::Client,
    config: UpstreamConfig,
    device_id: String,
    visitor: OnceCell<VisitorToken>,
}

#[derive(Debug, Clone)]
struct VisitorToken {
    user_id: i64,
    service_token: String,
}

impl AcFunClient {
    pub fn new(config: UpstreamConfig) -> Result<Self, LiveTrackError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LiveTrackError::Config(format!("cannot build HTTP client: {e}")))?;

        let device_id = config
            .device_id
            .clone()
            .unwrap_or_else(|| format!("web_{}", uuid::Uuid::new_v4().simple()));

        Ok(Self {
            client,
            config,
            device_id,
            visitor: OnceCell::new(),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn send(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, LiveTrackError> {
        let resp = request
            .header(COOKIE, format!("_did={}", self.device_id))
            .send()
            .await
            .map_err(|e| LiveTrackError::transport(endpoint, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| LiveTrackError::transport(endpoint, e))?;

        if !status.is_success() {
            return Err(LiveTrackError::Transport {
                endpoint: endpoint.to_string(),
                message: format!("HTTP {status}: {}", excerpt(&body)),
            });
        }
        Ok(body)
    }

    async fn fetch_list_page(&self, page_size: u64) -> Result<ChannelPage, LiveTrackError> {
        let request = self.client.get(&self.config.list_url).query(&[
            ("count", page_size.to_string()),
            ("pcursor", "0".to_string()),
        ]);
        let body = self.send(LIST, request).await?;
        parse_channel_list(&body)
    }

    async fn visitor_token(&self) -> Result<&VisitorToken, LiveTrackError> {
        self.visitor
            .get_or_try_init(|| async {
                let request = self
                    .client
                    .post(&self.config.visitor_login_url)
                    .form(&[("sid", VISITOR_SID)]);
                let body = self.send(VISITOR_LOGIN, request).await?;
                let token = parse_visitor_login(&body)?;
                tracing::debug!(user_id = token.user_id, "Visitor token acquired");
                Ok(token)
            })
            .await
    }

    /// Gateway calls share the same query string and a `liveId` form body.
    async fn gateway_post(
        &self,
        endpoint: &str,
        url: &str,
        kpf: &str,
        session_id: &str,
    ) -> Result<String, LiveTrackError> {
        let token = self.visitor_token().await?;
        let user_id = token.user_id.to_string();
        let request = self
            .client
            .post(url)
            .query(&[
                ("subBiz", "mainApp"),
                ("kpn", "ACFUN_APP"),
                ("kpf", kpf),
                ("userId", user_id.as_str()),
                ("did", self.device_id.as_str()),
                ("acfun.api.visitor_st", token.service_token.as_str()),
            ])
            .form(&[("liveId", session_id)]);
        self.send(endpoint, request).await
    }
}

#[async_trait]
impl UpstreamApi for AcFunClient {
    async fn fetch_snapshot(&self) -> Result<SnapshotMap, LiveTrackError> {
        let ceiling = self.config.page_size_ceiling;
        let mut page_size = self.config.initial_page_size.min(ceiling);

        // The listing has no usable cursor, so ask for bigger pages until one
        // holds everything.
        loop {
            let page = self.fetch_list_page(page_size).await?;
            if page.complete {
                tracing::debug!(page_size, live = page.sessions.len(), "Live list fetched");
                return Ok(page.sessions);
            }
            if page_size >= ceiling {
                return Err(LiveTrackError::PageSizeExceeded { ceiling });
            }
            page_size = page_size
                .saturating_mul(self.config.page_size_factor)
                .min(ceiling);
        }
    }

    async fn fetch_cut_info(
        &self,
        owner_id: i64,
        session_id: &str,
    ) -> Result<CutInfo, LiveTrackError> {
        let request = self.client.get(&self.config.cut_info_url).query(&[
            ("authorId", owner_id.to_string()),
            ("liveId", session_id.to_string()),
        ]);
        let body = self.send(CUT_INFO, request).await?;
        parse_cut_info(&body)
    }

    async fn fetch_summary(&self, session_id: &str) -> Result<Summary, LiveTrackError> {
        let body = self
            .gateway_post(SUMMARY, &self.config.summary_url, "PC_WEB", session_id)
            .await?;
        let duration_ms = parse_summary_duration(&body)?;
        if duration_ms == 0 {
            return Ok(Summary::default());
        }

        let recording_urls = self.fetch_recordings(session_id).await?;
        Ok(Summary {
            duration_ms,
            recording_urls,
        })
    }

    async fn fetch_recordings(&self, session_id: &str) -> Result<Vec<String>, LiveTrackError> {
        let body = self
            .gateway_post(
                PLAYBACK,
                &self.config.playback_url,
                "OUTSIDE_ANDROID_H5",
                session_id,
            )
            .await?;
        match parse_playback_urls(&body) {
            Ok(urls) => Ok(urls),
            // No recording is a normal outcome
            Err(LiveTrackError::UpstreamLogic { code, .. }) => {
                tracing::debug!(session_id, code, "No recording available");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

// -- Response parsing --

#[derive(Debug)]
pub(crate) struct ChannelPage {
    pub complete: bool,
    pub sessions: SnapshotMap,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelListResponse {
    channel_list_data: Option<ChannelListData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelListData {
    result: Option<i64>,
    #[serde(default)]
    pcursor: String,
    #[serde(default)]
    live_list: Vec<LiveRoom>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveRoom {
    live_id: String,
    author_id: i64,
    #[serde(default)]
    user: LiveUser,
    #[serde(default)]
    stream_name: String,
    #[serde(default)]
    create_time: i64,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize, Default)]
struct LiveUser {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CutInfoResponse {
    result: Option<i64>,
    #[serde(default)]
    live_cut_status: i64,
    #[serde(default)]
    live_cut_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisitorLoginResponse {
    result: Option<i64>,
    #[serde(default)]
    user_id: i64,
    #[serde(rename = "acfun.api.visitor_st", default)]
    service_token: String,
}

#[derive(Deserialize)]
struct GatewayResponse<T> {
    result: Option<i64>,
    data: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryData {
    #[serde(default)]
    live_duration_ms: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaybackData {
    #[serde(default)]
    adaptive_manifest: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    adaptation_set: Vec<AdaptationSet>,
}

#[derive(Deserialize)]
struct AdaptationSet {
    #[serde(default)]
    representation: Vec<Representation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Representation {
    #[serde(default)]
    url: String,
    #[serde(default)]
    backup_url: Vec<String>,
}

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

fn check_result(
    endpoint: &str,
    result: Option<i64>,
    expected: i64,
    body: &str,
) -> Result<(), LiveTrackError> {
    match result {
        Some(code) if code == expected => Ok(()),
        Some(code) => Err(LiveTrackError::UpstreamLogic {
            endpoint: endpoint.to_string(),
            code,
            body: excerpt(body),
        }),
        None => Err(LiveTrackError::parse(endpoint, "missing result field")),
    }
}

pub(crate) fn parse_channel_list(body: &str) -> Result<ChannelPage, LiveTrackError> {
    let resp: ChannelListResponse =
        serde_json::from_str(body).map_err(|e| LiveTrackError::parse(LIST, e))?;
    let data = resp
        .channel_list_data
        .ok_or_else(|| LiveTrackError::parse(LIST, "missing channelListData"))?;
    check_result(LIST, data.result, ACFUN_OK, body)?;

    let sessions = data
        .live_list
        .into_iter()
        .map(|room| {
            let session = Session {
                session_id: room.live_id,
                owner_id: room.author_id,
                owner_name: room.user.name,
                stream_token: room.stream_name,
                started_at_ms: room.create_time,
                title: room.title,
                ..Session::default()
            };
            (session.session_id.clone(), session)
        })
        .collect();

    Ok(ChannelPage {
        complete: data.pcursor == LIST_COMPLETE_CURSOR,
        sessions,
    })
}

pub(crate) fn parse_cut_info(body: &str) -> Result<CutInfo, LiveTrackError> {
    let resp: CutInfoResponse =
        serde_json::from_str(body).map_err(|e| LiveTrackError::parse(CUT_INFO, e))?;
    check_result(CUT_INFO, resp.result, ACFUN_OK, body)?;

    if resp.live_cut_status != CUT_READY_STATUS {
        return Ok(CutInfo::NotReady);
    }
    Ok(CutInfo::Ready {
        url: resp.live_cut_url,
    })
}

fn parse_visitor_login(body: &str) -> Result<VisitorToken, LiveTrackError> {
    let resp: VisitorLoginResponse =
        serde_json::from_str(body).map_err(|e| LiveTrackError::parse(VISITOR_LOGIN, e))?;
    check_result(VISITOR_LOGIN, resp.result, ACFUN_OK, body)?;
    if resp.service_token.is_empty() {
        return Err(LiveTrackError::parse(VISITOR_LOGIN, "empty visitor token"));
    }
    Ok(VisitorToken {
        user_id: resp.user_id,
        service_token: resp.service_token,
    })
}

pub(crate) fn parse_summary_duration(body: &str) -> Result<i64, LiveTrackError> {
    let resp: GatewayResponse<SummaryData> =
        serde_json::from_str(body).map_err(|e| LiveTrackError::parse(SUMMARY, e))?;
    check_result(SUMMARY, resp.result, GATEWAY_OK, body)?;
    Ok(resp.data.map(|d| d.live_duration_ms).unwrap_or(0))
}

pub(crate) fn parse_playback_urls(body: &str) -> Result<Vec<String>, LiveTrackError> {
    let resp: GatewayResponse<PlaybackData> =
        serde_json::from_str(body).map_err(|e| LiveTrackError::parse(PLAYBACK, e))?;
    check_result(PLAYBACK, resp.result, GATEWAY_OK, body)?;

    let manifest = match resp.data {
        Some(data) if !data.adaptive_manifest.is_empty() => data.adaptive_manifest,
        _ => return Ok(Vec::new()),
    };
    // The manifest arrives as a JSON document encoded inside a string field
    let manifest: Manifest =
        serde_json::from_str(&manifest).map_err(|e| LiveTrackError::parse(PLAYBACK, e))?;

    let mut urls: Vec<String> = Vec::new();
    for rep in manifest
        .adaptation_set
        .into_iter()
        .flat_map(|set| set.representation)
    {
        for url in std::iter::once(rep.url).chain(rep.backup_url) {
            if !url.is_empty() && !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_channel_list_complete() {
        let body = r#"{"channelListData":{"result":0,"pcursor":"no_more","liveList":[
            {"liveId":"abc","authorId":646973,"user":{"name":"Koi"},"streamName":"kszt_1",
             "createTime":1700000000000,"title":"evening stream"},
            {"liveId":"def","authorId":42,"streamName":"kszt_2","createTime":1700000001000}
        ]}}"#;
        let page = parse_channel_list(body).unwrap();
        assert!(page.complete);
        assert_eq!(page.sessions.len(), 2);

        let abc = &page.sessions["abc"];
        assert_eq!(abc.owner_id, 646973);
        assert_eq!(abc.owner_name, "Koi");
        assert_eq!(abc.stream_token, "kszt_1");
        assert_eq!(abc.started_at_ms, 1_700_000_000_000);
        assert_eq!(abc.title, "evening stream");
        assert_eq!(abc.duration_ms, 0);
        assert_eq!(abc.cut_number, 0);

        // Missing optional fields fall back to empty
        assert_eq!(page.sessions["def"].owner_name, "");
        assert_eq!(page.sessions["def"].title, "");
    }

    #[test]
    fn test_parse_channel_list_more_pages() {
        let body = r#"{"channelListData":{"result":0,"pcursor":"100","liveList":[]}}"#;
        let page = parse_channel_list(body).unwrap();
        assert!(!page.complete);
        assert!(page.sessions.is_empty());
    }

    #[test]
    fn test_parse_channel_list_nonzero_result() {
        let body = r#"{"channelListData":{"result":129,"error_msg":"busy"}}"#;
        match parse_channel_list(body).unwrap_err() {
            LiveTrackError::UpstreamLogic { code, body, .. } => {
                assert_eq!(code, 129);
                assert!(body.contains("busy"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_channel_list_missing_result_is_parse_error() {
        let body = r#"{"channelListData":{"pcursor":"no_more"}}"#;
        assert!(matches!(
            parse_channel_list(body),
            Err(LiveTrackError::Parse { .. })
        ));
        assert!(matches!(
            parse_channel_list("<html>"),
            Err(LiveTrackError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_cut_info_ready_and_not_ready() {
        let ready = r#"{"result":0,"liveCutStatus":1,"liveCutUrl":"https://m.acfun.cn/v/ac/12345"}"#;
        assert_eq!(
            parse_cut_info(ready).unwrap(),
            CutInfo::Ready {
                url: "https://m.acfun.cn/v/ac/12345".into()
            }
        );

        let pending = r#"{"result":0,"liveCutStatus":2}"#;
        assert_eq!(parse_cut_info(pending).unwrap(), CutInfo::NotReady);
    }

    #[test]
    fn test_parse_cut_info_failure_code() {
        let body = r#"{"result":-1,"error_msg":"liveId invalid"}"#;
        assert!(matches!(
            parse_cut_info(body),
            Err(LiveTrackError::UpstreamLogic { code: -1, .. })
        ));
    }

    #[test]
    fn test_parse_visitor_login() {
        let body = r#"{"result":0,"userId":1000000123,"acfun.api.visitor_st":"ChRh"}"#;
        let token = parse_visitor_login(body).unwrap();
        assert_eq!(token.user_id, 1_000_000_123);
        assert_eq!(token.service_token, "ChRh");

        let empty = r#"{"result":0,"userId":1}"#;
        assert!(parse_visitor_login(empty).is_err());
    }

    #[test]
    fn test_parse_summary_duration() {
        let body = r#"{"result":1,"data":{"liveDurationMs":600000,"likeCount":"12"}}"#;
        assert_eq!(parse_summary_duration(body).unwrap(), 600_000);

        let unfinished = r#"{"result":1,"data":{}}"#;
        assert_eq!(parse_summary_duration(unfinished).unwrap(), 0);

        let refused = r#"{"result":380023}"#;
        assert!(matches!(
            parse_summary_duration(refused),
            Err(LiveTrackError::UpstreamLogic { code: 380023, .. })
        ));
    }

    #[test]
    fn test_parse_playback_urls_collects_and_dedups() {
        let manifest = serde_json::json!({
            "adaptationSet": [{
                "representation": [{
                    "url": "https://alivod.example.com/a.m3u8",
                    "backupUrl": ["https://txvod.example.com/a.m3u8",
                                  "https://alivod.example.com/a.m3u8"]
                }]
            }]
        })
        .to_string();
        let body = serde_json::json!({
            "result": 1,
            "data": { "duration": 600000, "adaptiveManifest": manifest }
        })
        .to_string();

        let urls = parse_playback_urls(&body).unwrap();
        assert_eq!(
            urls,
            vec![
                "https://alivod.example.com/a.m3u8".to_string(),
                "https://txvod.example.com/a.m3u8".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_playback_without_manifest() {
        let body = r#"{"result":1,"data":{"duration":0}}"#;
        assert!(parse_playback_urls(body).unwrap().is_empty());
    }

    #[test]
    fn test_excerpt_is_char_safe() {
        let long = "直".repeat(BODY_EXCERPT_CHARS + 10);
        assert_eq!(excerpt(&long).chars().count(), BODY_EXCERPT_CHARS);
    }

    #[test]
    fn test_configured_device_id_is_used() {
        let config = UpstreamConfig {
            device_id: Some("web_fixed".into()),
            ..UpstreamConfig::default()
        };
        let client = AcFunClient::new(config).unwrap();
        assert_eq!(client.device_id(), "web_fixed");

        let generated = AcFunClient::new(UpstreamConfig::default()).unwrap();
        assert!(generated.device_id().starts_with("web_"));
    }
}
