//! Natural-language questions in, SQL results and a narrative out.
//!
//! [`QueryAssistant::answer`] is the whole pipeline: pick a database, gather
//! and shrink the schema context, have the model write SQL, run it, and have
//! the model explain the rows. It never returns an error; failures end up in
//! [`QueryAnswer::explanation`].

use crate::context::{
    detect_database, limit_context, mentioned_databases, primary_key_summary, qualified_database,
    reduce_schema, resolve_target_database, ContextPolicy,
};
use crate::domain::Schema;
use crate::error::{Error, LlmError, Result};
use crate::introspect::Row;
use crate::llm::{CompletionRequest, LanguageModel};
use crate::query::is_read_only;
use crate::service::SchemaContextService;
use serde::Serialize;
use std::sync::Arc;

const SQL_TEMPERATURE: f32 = 0.2;
const EXPLAIN_TEMPERATURE: f32 = 0.7;

const SQL_GENERATOR_ROLE: &str = "You are a helpful SQL query generator. \
Your task is to convert natural language into valid SQL queries.";

const SQL_INSTRUCTIONS: &str = "\
Important instructions:
1. Generate ONLY the SQL query without ANY explanations or comments.
2. Even if the query requires joins or subqueries to connect tables, still return ONLY the SQL.
3. Do not prefix your response with text like \"SQL:\" or similar.
4. If a query needs to find information based on a name or other identifier that requires joining tables, always produce a valid SQL query.
5. For complex queries involving multiple tables, use appropriate JOIN statements.
6. Do NOT return text explaining why you can't generate a query - if it's possible to write SQL for the request, write it.
7. Your response must begin with SQL keywords like SELECT, SHOW or DESCRIBE.";

const EXPLAIN_SYSTEM_PROMPT: &str = "\
You are a helpful assistant that explains database query results in natural language.
Your task is to provide a clear, concise explanation of the query results.";

/// Models and limits used by [`QueryAssistant`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantSettings {
    /// Model tried first.
    pub model: String,
    /// Model used for the single retry after a token limit.
    pub fallback_model: String,
    /// Completion length cap for every call.
    pub max_tokens: u32,
    /// Rows shown to the model when explaining results.
    pub max_result_rows: usize,
    /// Context reduction knobs.
    pub policy: ContextPolicy,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            fallback_model: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
            max_result_rows: 10,
            policy: ContextPolicy::default(),
        }
    }
}

/// Outcome of one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    /// The question as asked.
    pub query: String,
    /// Generated statement, `None` if none was run.
    pub sql: Option<String>,
    /// Rows returned by the statement.
    pub results: Option<Vec<Row>>,
    /// Narrative answer, the model's refusal, or the error message.
    pub explanation: String,
}

impl QueryAnswer {
    fn without_results(query: &str, explanation: String) -> Self {
        Self {
            query: query.to_string(),
            sql: None,
            results: None,
            explanation,
        }
    }
}

/// Schema context prepared for a question.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptContext {
    /// Database given or detected for the question.
    pub database: Option<String>,
    /// Non-system databases on the server.
    pub user_databases: Vec<String>,
    /// Tables judged relevant to the question.
    pub reduced: Schema,
    /// `reduced` trimmed to the prompt budget.
    pub limited: Schema,
}

/// Gather and shrink the schema context for `question`.
///
/// With a database (given or detected from the question) its cached entry is
/// used, or it is introspected live. Without one the whole cache is used,
/// else just the databases named in the question, else every database.
///
/// # Errors
///
/// Returns an introspection error if the server cannot be reached.
pub async fn prompt_context(
    service: &SchemaContextService,
    question: &str,
    database: Option<&str>,
    policy: &ContextPolicy,
) -> Result<PromptContext> {
    let user_databases = service.list_user_databases().await?;

    let database = database
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .or_else(|| detect_database(question, &user_databases).map(str::to_string));

    let context = match database.as_deref() {
        Some(database) => {
            let mut context = Schema::new();
            let tables = service.get_database_schema(database, true).await?;
            context.insert_database(database, tables);
            context
        }
        None => gather_without_database(service, question, &user_databases).await?,
    };

    let reduced = reduce_schema(question, &context, policy.sample_tables);
    let limited = limit_context(&reduced, database.as_deref(), policy);

    Ok(PromptContext {
        database,
        user_databases,
        reduced,
        limited,
    })
}

async fn gather_without_database(
    service: &SchemaContextService,
    question: &str,
    user_databases: &[String],
) -> Result<Schema> {
    if let Some(cached) = service.cache().load().await.filter(|s| !s.is_empty()) {
        tracing::debug!("Using complete cached schema");
        return Ok(cached);
    }

    let mentioned = mentioned_databases(question, user_databases);
    if mentioned.is_empty() {
        tracing::debug!("Building complete schema context");
        return service.build_full_context(true).await;
    }

    let mut context = Schema::new();
    for database in mentioned {
        let tables = service.get_database_schema(database, false).await?;
        context.insert_database(database, tables);
    }
    tracing::debug!(databases = context.len(), "Fetched schemas for mentioned databases");
    Ok(context)
}

/// Answers questions with a [`LanguageModel`] and a [`SchemaContextService`].
#[derive(Clone)]
pub struct QueryAssistant {
    service: SchemaContextService,
    model: Arc<dyn LanguageModel>,
    settings: AssistantSettings,
}

impl std::fmt::Debug for QueryAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAssistant")
            .field("service", &self.service)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl QueryAssistant {
    /// Build an assistant.
    pub fn new(
        service: SchemaContextService,
        model: Arc<dyn LanguageModel>,
        settings: AssistantSettings,
    ) -> Self {
        Self {
            service,
            model,
            settings,
        }
    }

    /// Answer `question`, optionally against a specific database.
    ///
    /// Never fails: errors become `"I encountered an error: ..."` in the
    /// explanation, with no SQL and no results.
    pub async fn answer(&self, question: &str, database: Option<&str>) -> QueryAnswer {
        match self.try_answer(question, database).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "Question could not be answered");
                QueryAnswer::without_results(question, format!("I encountered an error: {e}"))
            }
        }
    }

    async fn try_answer(&self, question: &str, database: Option<&str>) -> Result<QueryAnswer> {
        let context =
            prompt_context(&self.service, question, database, &self.settings.policy).await?;

        let sql = self.generate_sql(question, &context.limited).await?;
        if !is_read_only(&sql) {
            return Ok(QueryAnswer::without_results(question, sql));
        }

        let target = context
            .database
            .clone()
            .or_else(|| qualified_database(&sql))
            .or_else(|| {
                resolve_target_database(question, None, &context.reduced, &context.user_databases)
            })
            .ok_or_else(|| {
                Error::Validation("No database available to run the query".to_string())
            })?;
        tracing::debug!(database = %target, sql = %sql, "Running generated query");

        let results = self.service.run_query(&sql, &target).await?;
        let explanation = self.explain_results(question, &results).await?;

        Ok(QueryAnswer {
            query: question.to_string(),
            sql: Some(sql),
            results: Some(results),
            explanation,
        })
    }

    fn request(
        &self,
        system_prompt: String,
        user_text: String,
        model: &str,
        temperature: f32,
    ) -> CompletionRequest {
        CompletionRequest {
            system_prompt,
            user_text,
            model: model.to_string(),
            temperature,
            max_tokens: self.settings.max_tokens,
        }
    }

    /// Try `primary`; on a model limit, try `fallback` exactly once.
    async fn complete_with_fallback(
        &self,
        primary: CompletionRequest,
        fallback: impl FnOnce() -> Result<CompletionRequest>,
    ) -> Result<String> {
        match self.model.complete(&primary).await {
            Err(LlmError::ModelLimit(message)) => {
                let fallback = fallback()?;
                tracing::warn!(
                    from = %primary.model,
                    to = %fallback.model,
                    reason = %message,
                    "Model limit reached, retrying with fallback model"
                );
                Ok(self.model.complete(&fallback).await?)
            }
            other => Ok(other?),
        }
    }

    async fn generate_sql(&self, question: &str, context: &Schema) -> Result<String> {
        let schema_json = serde_json::to_string_pretty(context)?;
        let primary = self.request(
            format!(
                "{SQL_GENERATOR_ROLE}\n\n\
                 Here is the database schema information:\n{schema_json}\n\n{SQL_INSTRUCTIONS}"
            ),
            question.to_string(),
            &self.settings.model,
            SQL_TEMPERATURE,
        );

        self.complete_with_fallback(primary, || {
            let minimal = serde_json::to_string_pretty(&primary_key_summary(context))?;
            Ok(self.request(
                format!(
                    "{SQL_GENERATOR_ROLE}\n\n\
                     Here is the minimal database schema information:\n\
                     {minimal}\n\n{SQL_INSTRUCTIONS}"
                ),
                question.to_string(),
                &self.settings.fallback_model,
                SQL_TEMPERATURE,
            ))
        })
        .await
    }

    async fn explain_results(&self, question: &str, results: &[Row]) -> Result<String> {
        let user_text = explanation_prompt(question, results, self.settings.max_result_rows)?;
        let primary = self.request(
            EXPLAIN_SYSTEM_PROMPT.to_string(),
            user_text.clone(),
            &self.settings.model,
            EXPLAIN_TEMPERATURE,
        );

        self.complete_with_fallback(primary, || {
            Ok(self.request(
                EXPLAIN_SYSTEM_PROMPT.to_string(),
                user_text,
                &self.settings.fallback_model,
                EXPLAIN_TEMPERATURE,
            ))
        })
        .await
    }
}

fn explanation_prompt(question: &str, results: &[Row], max_rows: usize) -> Result<String> {
    let shown = &results[..results.len().min(max_rows)];
    let rows_json = serde_json::to_string_pretty(shown)?;
    let note = if results.len() > max_rows {
        format!("\n(Showing first {max_rows} of {} results)", results.len())
    } else {
        String::new()
    };
    Ok(format!(
        "Original question: \"{question}\"\n\nQuery results: {rows_json}{note}\n\n\
         Please explain these results in a conversational way."
    ))
}
