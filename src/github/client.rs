use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::form_urlencoded;

use super::api_types::{decode, ApiIssue, ApiLabel, ApiMilestone, ApiRepository, ApiUser};
use super::types::{BoardData, Issue, IssueState, Label, Milestone, MilestoneFilter, Repository, User};
use crate::request::{
  settle_all, RequestClient, RequestDescriptor, RequestError, RequestOptions, Response,
};

/// Issues fetched per state; pagination is not followed
pub const ISSUES_PER_PAGE: u32 = 100;

/// Changes sent with `PATCH /repos/{repo}/issues/{number}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueUpdate {
  pub labels: Option<Vec<String>>,
  pub state: Option<IssueState>,
  pub assignees: Option<Vec<String>>,
}

impl IssueUpdate {
  fn to_body(&self) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(labels) = &self.labels {
      body.insert("labels".into(), Value::from(labels.clone()));
    }
    if let Some(state) = self.state {
      body.insert("state".into(), Value::from(state.as_str()));
    }
    if let Some(assignees) = &self.assignees {
      body.insert("assignees".into(), Value::from(assignees.clone()));
    }
    Value::Object(body)
  }
}

/// GitHub API client for one repository
#[derive(Clone)]
pub struct GithubClient {
  requests: RequestClient,
  repo: String,
}

impl GithubClient {
  /// `repo` is `owner/name`
  pub fn new(requests: RequestClient, repo: impl Into<String>) -> Self {
    Self {
      requests,
      repo: repo.into(),
    }
  }

  pub fn repo(&self) -> &str {
    &self.repo
  }

  pub fn requests(&self) -> &RequestClient {
    &self.requests
  }

  pub fn is_logged_in(&self) -> bool {
    self.requests.tokens().is_logged_in()
  }

  // ==========================================================================
  // Resource descriptors
  // ==========================================================================

  pub fn repository_request(&self) -> RequestDescriptor {
    RequestDescriptor::get(format!("/repos/{}", self.repo))
  }

  pub fn labels_request(&self) -> RequestDescriptor {
    RequestDescriptor::get(format!("/repos/{}/labels", self.repo))
  }

  pub fn issues_request(&self, state: IssueState, milestone: MilestoneFilter) -> RequestDescriptor {
    let query = form_urlencoded::Serializer::new(String::new())
      .append_pair("state", state.as_str())
      .append_pair("per_page", &ISSUES_PER_PAGE.to_string())
      .append_pair("milestone", &milestone.to_query())
      .finish();
    RequestDescriptor::get(format!("/repos/{}/issues?{}", self.repo, query))
  }

  pub fn collaborators_request(&self) -> RequestDescriptor {
    RequestDescriptor::get(format!("/repos/{}/collaborators", self.repo))
  }

  pub fn milestones_request(&self) -> RequestDescriptor {
    RequestDescriptor::get(format!("/repos/{}/milestones", self.repo))
  }

  pub fn milestone_request(&self, number: u64) -> RequestDescriptor {
    RequestDescriptor::get(format!("/repos/{}/milestones/{}", self.repo, number))
  }

  // ==========================================================================
  // Single resources
  // ==========================================================================

  async fn get<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T, RequestError> {
    let response = self
      .requests
      .fetch(descriptor, RequestOptions::default())
      .await?;
    decode(&response)
  }

  pub async fn get_repository(&self) -> Result<Repository, RequestError> {
    let repo: ApiRepository = self.get(self.repository_request()).await?;
    Ok(repo.into())
  }

  pub async fn get_labels(&self) -> Result<Vec<Label>, RequestError> {
    let labels: Vec<ApiLabel> = self.get(self.labels_request()).await?;
    Ok(labels.into_iter().map(Label::from).collect())
  }

  /// Open milestones of the repository
  pub async fn get_milestones(&self) -> Result<Vec<Milestone>, RequestError> {
    let response = self
      .requests
      .fetch(self.milestones_request(), RequestOptions::default())
      .await?;
    decode_milestones(&response)
  }

  /// Open milestones, reporting cached milestones to `on_provisional` while
  /// they are revalidated.
  pub async fn load_milestones<F>(&self, on_provisional: F) -> Result<Vec<Milestone>, RequestError>
  where
    F: FnOnce(Vec<Milestone>),
  {
    let subscription = self
      .requests
      .subscribe(self.milestones_request(), RequestOptions::default());
    let settled = settle_all(vec![subscription], |round| {
      if let Some(Ok(milestones)) = round.first().map(decode_milestones) {
        on_provisional(milestones);
      }
    })
    .await?;
    settled
      .first()
      .ok_or(RequestError::Abandoned)
      .and_then(decode_milestones)
  }

  pub async fn get_milestone(&self, number: u64) -> Result<Milestone, RequestError> {
    let milestone: ApiMilestone = self.get(self.milestone_request(number)).await?;
    Ok(milestone.into())
  }

  pub async fn get_collaborators(&self) -> Result<Vec<User>, RequestError> {
    let users: Vec<ApiUser> = self.get(self.collaborators_request()).await?;
    Ok(users.into_iter().map(User::from).collect())
  }

  pub async fn get_issues(
    &self,
    state: IssueState,
    milestone: MilestoneFilter,
  ) -> Result<Vec<Issue>, RequestError> {
    let response = self
      .requests
      .fetch(self.issues_request(state, milestone), RequestOptions::default())
      .await?;
    decode_issues(&response)
  }

  /// Apply `update` to an issue and return it as the server stored it.
  pub async fn update_issue(&self, number: u64, update: &IssueUpdate) -> Result<Issue, RequestError> {
    info!(repo = %self.repo, number, "updating issue");
    let descriptor = RequestDescriptor::patch(
      format!("/repos/{}/issues/{}", self.repo, number),
      update.to_body(),
    );
    let issue: ApiIssue = self.get(descriptor).await?;
    Ok(issue.into())
  }

  /// Forget cached issue lists so a reload shows the effect of a mutation.
  pub fn invalidate_issues(&self, milestone: MilestoneFilter) {
    for state in [IssueState::Open, IssueState::Closed] {
      self.requests.invalidate(&self.issues_request(state, milestone));
    }
  }

  // ==========================================================================
  // Board
  // ==========================================================================

  /// Load everything the board view shows.
  ///
  /// If any part was served from the cache, `on_provisional` receives a board
  /// assembled from the first round of deliveries before the revalidated board
  /// is returned.
  pub async fn load_board<F>(
    &self,
    milestone: MilestoneFilter,
    on_provisional: F,
  ) -> Result<BoardData, RequestError>
  where
    F: FnOnce(BoardData),
  {
    let logged_in = self.is_logged_in();
    let mut descriptors = vec![
      self.repository_request(),
      self.labels_request(),
      self.issues_request(IssueState::Open, milestone),
      self.issues_request(IssueState::Closed, milestone),
    ];
    if logged_in {
      descriptors.push(self.collaborators_request());
      descriptors.push(self.milestones_request());
    }
    if let MilestoneFilter::Number(number) = milestone {
      descriptors.push(self.milestone_request(number));
    }

    debug!(repo = %self.repo, requests = descriptors.len(), "loading board");
    let subscriptions = descriptors
      .into_iter()
      .map(|d| self.requests.subscribe(d, RequestOptions::default()))
      .collect();

    let settled = settle_all(subscriptions, |round| {
      match assemble_board(round, logged_in, milestone) {
        Ok(board) => on_provisional(board),
        Err(e) => debug!("Skipping undecodable cached board: {}", e),
      }
    })
    .await?;

    assemble_board(&settled, logged_in, milestone)
  }
}

fn decode_milestones(response: &Response) -> Result<Vec<Milestone>, RequestError> {
  let milestones: Vec<ApiMilestone> = decode(response)?;
  Ok(milestones.into_iter().map(Milestone::from).collect())
}

fn decode_issues(response: &Response) -> Result<Vec<Issue>, RequestError> {
  let issues: Vec<ApiIssue> = decode(response)?;
  Ok(
    issues
      .into_iter()
      .filter(|i| !i.is_pull_request())
      .map(Issue::from)
      .collect(),
  )
}

/// Build a board from responses in the order `load_board` requested them.
fn assemble_board(
  responses: &[Response],
  logged_in: bool,
  milestone: MilestoneFilter,
) -> Result<BoardData, RequestError> {
  let mut it = responses.iter();
  let mut next = || it.next().ok_or(RequestError::Abandoned);

  let repository: ApiRepository = decode(next()?)?;
  let labels: Vec<ApiLabel> = decode(next()?)?;
  let mut issues = decode_issues(next()?)?;
  issues.extend(decode_issues(next()?)?);

  let (collaborators, milestones) = if logged_in {
    let users: Vec<ApiUser> = decode(next()?)?;
    let milestones: Vec<ApiMilestone> = decode(next()?)?;
    (
      users.into_iter().map(User::from).collect(),
      milestones.into_iter().map(Milestone::from).collect(),
    )
  } else {
    (Vec::new(), Vec::new())
  };

  let milestone = match milestone {
    MilestoneFilter::Number(_) => {
      let m: ApiMilestone = decode(next()?)?;
      Some(Milestone::from(m))
    }
    MilestoneFilter::None => None,
  };

  Ok(BoardData {
    repository: repository.into(),
    labels: labels.into_iter().map(Label::from).collect(),
    issues,
    collaborators,
    milestones,
    milestone,
  })
}
