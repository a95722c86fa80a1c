//! GitHub endpoint URLs and GraphQL query text

/// GraphQL endpoint
pub const GITHUB_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// REST lookup endpoint for opaque numeric repository ids
pub const GITHUB_REPOSITORY_ID_URL: &str = "https://api.github.com/repositories/";

/// Query for the current key's rate limit, without spending quota
pub const RATE_LIMIT_QUERY: &str = r#"
query {
  rateLimit(dryRun:true) {
    limit,
    cost,
    remaining,
    resetAt
  }
}
"#;

/// Query for one repository's metadata plus the rate limit in one round trip
pub const REPOSITORY_QUERY: &str = r#"
query GetRepo($owner: String!, $name: String!) {
  repository(owner:$owner, name:$name) {
    id,
    name,
    owner {
      login
    },
    homepageUrl,
    openGraphImageUrl,
    createdAt,
    updatedAt,
    pushedAt,
    description,
    diskUsage,
    forkCount,
    hasWikiEnabled,
    hasIssuesEnabled,
    hasProjectsEnabled,
    isArchived,
    isDisabled,
    isEmpty,
    isFork,
    isLocked,
    isMirror,
    isPrivate,
    isTemplate,
    mergeCommitAllowed,

    watchers(first:1){
      totalCount
    },

    stargazers(first:1){
      totalCount
    },

    commitComments(first:1){
      totalCount
    },

    pullRequests {
      totalCount
    },

    releases(first:1) {
      totalCount
    },

    primaryLanguage {
      name
    },

    languages(first:100) {
      nodes {
        name
      }
    },

    labels(first:1) {
      totalCount
    },

    licenseInfo {
      name
    },

    deployments {
      totalCount
    },

    repositoryTopics(first:100){
      nodes {
        topic{
          name
        }
      }
    },
  },

  rateLimit {
    limit,
    cost,
    remaining,
    resetAt
  }
}
"#;
