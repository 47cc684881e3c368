//! TM1 REST API client.
//!
//! Speaks the OData v4 REST API of Planning Analytics. One [`RestClient`]
//! talks to one environment and keeps the server session in its cookie
//! store.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::{Connection, EnvironmentConfig};
use crate::core::{
    CellTuple, CellValue, Cellset, Cube, Dimension, Hierarchy, ObjectKind, OlapClient, Process,
    Subset, View, LEAVES_HIERARCHY,
};
use crate::error::{MigrateError, Result};

/// Annotations returned by GET that the server refuses on POST.
const READ_ONLY_ANNOTATIONS: [&str; 2] = ["@odata.context", "@odata.etag"];

#[derive(Deserialize)]
struct Collection<T> {
    value: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Named {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubsetPayload {
    name: String,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    elements: Vec<Named>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CubePayload {
    name: String,
    #[serde(default)]
    rules: Option<String>,
    #[serde(default)]
    dimensions: Vec<Named>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CellsetPayload {
    #[serde(rename = "ID")]
    id: String,
    #[serde(default)]
    axes: Vec<AxisPayload>,
    #[serde(default)]
    cells: Vec<CellPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AxisPayload {
    #[serde(default)]
    tuples: Vec<TuplePayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TuplePayload {
    #[serde(default)]
    members: Vec<Named>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CellPayload {
    ordinal: usize,
    #[serde(default)]
    value: Value,
}

/// `Collection('name')` with the name escaped as an OData string literal.
fn entity(collection: &str, name: &str) -> String {
    format!("{}('{}')", collection, name.replace('\'', "''"))
}

/// OData bind path of an element.
fn element_bind(dimension: &str, hierarchy: &str, element: &str) -> String {
    format!(
        "{}/{}/{}",
        entity("Dimensions", dimension),
        entity("Hierarchies", hierarchy),
        entity("Elements", element)
    )
}

/// Authorization header value for a connection, if it authenticates.
fn authorization(connection: &Connection) -> Option<String> {
    match connection {
        Connection::Saas { api_key, .. } => Some(format!(
            "Basic {}",
            STANDARD.encode(format!("apikey:{}", api_key))
        )),
        Connection::Cloud {
            user,
            password,
            cam_namespace,
            ..
        } => Some(format!(
            "CAMNamespace {}",
            STANDARD.encode(format!("{}:{}:{}", user, password, cam_namespace))
        )),
        Connection::Url {
            user,
            password,
            namespace: Some(namespace),
            ..
        } => Some(format!(
            "CAMNamespace {}",
            STANDARD.encode(format!("{}:{}:{}", user, password, namespace))
        )),
        Connection::Url { user, .. } if user.is_empty() => None,
        Connection::Url { user, password, .. } => Some(format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", user, password))
        )),
    }
}

/// Error message from a TM1 error body, or the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    if message.is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, message)
    }
}

fn strip_annotations(mut body: Value) -> Value {
    if let Value::Object(map) = &mut body {
        for key in READ_ONLY_ANNOTATIONS {
            map.remove(key);
        }
    }
    body
}

/// Convert an `ExecuteMDX` response with one column axis into a cellset.
fn cellset_from_payload(payload: CellsetPayload) -> Result<Cellset> {
    let tuples: Vec<CellTuple> = match payload.axes.into_iter().next() {
        Some(axis) => axis
            .tuples
            .into_iter()
            .map(|t| CellTuple::new(t.members.into_iter().map(|m| m.name)))
            .collect(),
        None => return Ok(Cellset::new()),
    };

    let mut cells = Cellset::new();
    for cell in payload.cells {
        let Some(value) = CellValue::from_json(&cell.value) else {
            continue;
        };
        let tuple = tuples.get(cell.ordinal).ok_or_else(|| {
            MigrateError::InvalidResponse(format!(
                "cell ordinal {} outside of {} tuples",
                cell.ordinal,
                tuples.len()
            ))
        })?;
        cells.push(tuple.clone(), value);
    }
    Ok(cells)
}

/// One `tm1.Update` entry. A component prefixed with one of its
/// dimension's alternate `hierarchies` addresses that hierarchy; any other
/// component is an element of the default hierarchy.
fn update_entry(
    dimensions: &[String],
    hierarchies: &[Vec<String>],
    tuple: &CellTuple,
    value: &CellValue,
) -> Value {
    let binds: Vec<String> = dimensions
        .iter()
        .zip(tuple.elements())
        .enumerate()
        .map(|(position, (dimension, component))| {
            let known = hierarchies.get(position).map(Vec::as_slice).unwrap_or(&[]);
            let (hierarchy, element) = CellTuple::split_component(component, known);
            element_bind(dimension, hierarchy.unwrap_or(dimension), element)
        })
        .collect();
    json!({
        "Cells": [{ "Tuple@odata.bind": binds }],
        "Value": value.to_json(),
    })
}

/// Answer of the server to a `tm1.Update` post.
enum UpdateOutcome {
    Applied,
    /// 400: the server refused one or more of the addressed cells.
    CellsRefused(String),
}

/// REST client for one Planning Analytics environment.
pub struct RestClient {
    name: String,
    client: Client,
    service_root: Url,
    write_batch_size: usize,
}

impl RestClient {
    /// Build a client. Does not contact the server.
    pub fn new(name: &str, env: &EnvironmentConfig) -> Result<Self> {
        if !env.verify_tls {
            warn!("{}: TLS certificate verification disabled", name);
        }

        let mut headers = HeaderMap::new();
        headers.insert("tm1-sessioncontext", HeaderValue::from_static("pa-migrate"));
        if let Some(auth) = authorization(&env.connection) {
            let mut value = HeaderValue::from_str(&auth).map_err(|e| {
                MigrateError::Config(format!("{}: invalid credentials: {}", name, e))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(env.timeout_secs))
            .danger_accept_invalid_certs(!env.verify_tls)
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        let service_root = Url::parse(&env.service_root()).map_err(|e| {
            MigrateError::Config(format!("{}: invalid service root: {}", name, e))
        })?;

        Ok(Self {
            name: name.to_string(),
            client,
            service_root,
            write_batch_size: env.write_batch_size.max(1),
        })
    }

    /// Builds a URL from path segments and an optional query.
    fn url(&self, segments: &[&str], query: Option<&str>) -> Result<Url> {
        let mut url = self.service_root.clone();
        url.path_segments_mut()
            .map_err(|_| {
                MigrateError::Config(format!("{}: service root cannot be a base", self.name))
            })?
            .pop_if_empty()
            .extend(segments);
        url.set_query(query);
        Ok(url)
    }

    /// Server product version; used as the connectivity probe.
    pub async fn product_version(&self) -> Result<String> {
        let url = self.url(&["Configuration", "ProductVersion", "$value"], None)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(MigrateError::connectivity(
                &self.name,
                error_message(status, &body),
            ));
        }
        Ok(body.trim().to_string())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        kind: ObjectKind,
        name: &str,
    ) -> Result<T> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(MigrateError::not_found(kind, name));
        }
        if !status.is_success() {
            let body = response.text().await?;
            return Err(MigrateError::InvalidResponse(error_message(status, &body)));
        }
        Ok(response.json().await?)
    }

    async fn names(&self, url: Url, kind: ObjectKind, name: &str) -> Result<Vec<String>> {
        let collection: Collection<Named> = self.get_json(url, kind, name).await?;
        Ok(collection.value.into_iter().map(|n| n.name).collect())
    }

    async fn exists(&self, url: Url) -> Result<bool> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            let body = response.text().await?;
            return Err(MigrateError::InvalidResponse(error_message(status, &body)));
        }
        Ok(true)
    }

    /// Send a write request; any non-success status is a rejection.
    async fn send_write(&self, request: RequestBuilder, object: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(MigrateError::rejected(object, error_message(status, &body)));
        }
        Ok(response)
    }

    async fn delete_if_exists(&self, url: Url, object: &str) -> Result<()> {
        let response = self.client.delete(url).send().await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        let body = response.text().await?;
        Err(MigrateError::rejected(object, error_message(status, &body)))
    }

    async fn upsert_hierarchy(&self, dimension: &str, hierarchy: &Hierarchy) -> Result<()> {
        let dim_segment = entity("Dimensions", dimension);
        let hier_segment = entity("Hierarchies", &hierarchy.name);
        let body = json!({
            "Name": hierarchy.name,
            "Elements": hierarchy.elements,
            "Edges": hierarchy.edges,
        });
        let object = format!("{}:{}", dimension, hierarchy.name);

        let url = self.url(&[&dim_segment, &hier_segment], Some("$select=Name"))?;
        if self.exists(url).await? {
            let url = self.url(&[&dim_segment, &hier_segment], None)?;
            self.send_write(self.client.patch(url).json(&body), &object)
                .await?;
        } else {
            let url = self.url(&[&dim_segment, "Hierarchies"], None)?;
            self.send_write(self.client.post(url).json(&body), &object)
                .await?;
        }

        let url = self.url(
            &[&dim_segment, &hier_segment, "ElementAttributes"],
            Some("$select=Name"),
        )?;
        let existing = self.names(url, ObjectKind::Dimension, &object).await?;
        for name in &existing {
            if hierarchy.element_attributes.iter().any(|a| &a.name == name) {
                continue;
            }
            debug!("{}: removing attribute {} of {}", self.name, name, object);
            let url = self.url(
                &[
                    &dim_segment,
                    &hier_segment,
                    &entity("ElementAttributes", name),
                ],
                None,
            )?;
            self.delete_if_exists(url, &object).await?;
        }
        for attribute in &hierarchy.element_attributes {
            if existing.contains(&attribute.name) {
                continue;
            }
            let url = self.url(&[&dim_segment, &hier_segment, "ElementAttributes"], None)?;
            self.send_write(self.client.post(url).json(attribute), &object)
                .await?;
        }
        Ok(())
    }

    async fn create_cube(&self, cube: &Cube) -> Result<()> {
        let binds: Vec<String> = cube
            .dimensions
            .iter()
            .map(|d| entity("Dimensions", d))
            .collect();
        let mut body = json!({
            "Name": cube.name,
            "Dimensions@odata.bind": binds,
        });
        if let Some(rules) = &cube.rules {
            body["Rules"] = json!(rules);
        }
        let url = self.url(&["Cubes"], None)?;
        self.send_write(self.client.post(url).json(&body), &cube.name)
            .await?;
        Ok(())
    }

    /// Post update entries. Statuses other than success and 400 reject
    /// the whole write.
    async fn post_updates(
        &self,
        cube_segment: &str,
        body: &Value,
        cube: &str,
    ) -> Result<UpdateOutcome> {
        let url = self.url(&[cube_segment, "tm1.Update"], None)?;
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(UpdateOutcome::Applied);
        }
        let message = error_message(status, &response.text().await?);
        if status == StatusCode::BAD_REQUEST {
            return Ok(UpdateOutcome::CellsRefused(message));
        }
        Err(MigrateError::rejected(cube, message))
    }

    /// Alternate hierarchy names per dimension position. Only looked up
    /// for positions where some component contains a `:`.
    async fn alternate_hierarchies(
        &self,
        dimensions: &[String],
        cells: &Cellset,
    ) -> Result<Vec<Vec<String>>> {
        let mut hierarchies = Vec::with_capacity(dimensions.len());
        for (position, dimension) in dimensions.iter().enumerate() {
            let prefixed = cells
                .iter()
                .any(|(tuple, _)| tuple.get(position).is_some_and(|c| c.contains(':')));
            if !prefixed {
                hierarchies.push(Vec::new());
                continue;
            }
            let names = self.hierarchy_names(dimension).await?;
            hierarchies.push(
                names
                    .into_iter()
                    .filter(|h| h != dimension && h != LEAVES_HIERARCHY)
                    .collect(),
            );
        }
        Ok(hierarchies)
    }
}

#[async_trait]
impl OlapClient for RestClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn object_names(&self, kind: ObjectKind) -> Result<Vec<String>> {
        let collection = match kind {
            ObjectKind::Dimension => "Dimensions",
            ObjectKind::Cube => "Cubes",
            ObjectKind::Process => "Processes",
        };
        let url = self.url(&[collection], Some("$select=Name"))?;
        self.names(url, kind, collection).await
    }

    async fn get_dimension(&self, name: &str) -> Result<Dimension> {
        let url = self.url(
            &[&entity("Dimensions", name)],
            Some(
                "$select=Name&$expand=Hierarchies($select=Name;$expand=\
                 Elements($select=Name,Type),\
                 Edges($select=ParentName,ComponentName,Weight),\
                 ElementAttributes($select=Name,Type))",
            ),
        )?;
        let mut dimension: Dimension = self.get_json(url, ObjectKind::Dimension, name).await?;
        dimension.hierarchies.retain(|h| h.name != LEAVES_HIERARCHY);
        Ok(dimension)
    }

    async fn upsert_dimension(&self, dimension: &Dimension) -> Result<()> {
        let dim_segment = entity("Dimensions", &dimension.name);
        let url = self.url(&[&dim_segment], Some("$select=Name"))?;
        if !self.exists(url).await? {
            debug!("{}: creating dimension {}", self.name, dimension.name);
            let url = self.url(&["Dimensions"], None)?;
            let body = json!({ "Name": dimension.name });
            self.send_write(self.client.post(url).json(&body), &dimension.name)
                .await?;
        }
        for hierarchy in dimension
            .hierarchies
            .iter()
            .filter(|h| h.name != LEAVES_HIERARCHY)
        {
            self.upsert_hierarchy(&dimension.name, hierarchy).await?;
        }

        for name in self.hierarchy_names(&dimension.name).await? {
            if name == LEAVES_HIERARCHY
                || name == dimension.name
                || dimension.hierarchies.iter().any(|h| h.name == name)
            {
                continue;
            }
            debug!("{}: removing hierarchy {}:{}", self.name, dimension.name, name);
            let url = self.url(&[&dim_segment, &entity("Hierarchies", &name)], None)?;
            self.delete_if_exists(url, &format!("{}:{}", dimension.name, name))
                .await?;
        }
        Ok(())
    }

    async fn hierarchy_names(&self, dimension: &str) -> Result<Vec<String>> {
        let url = self.url(
            &[&entity("Dimensions", dimension), "Hierarchies"],
            Some("$select=Name"),
        )?;
        self.names(url, ObjectKind::Dimension, dimension).await
    }

    async fn leaf_element_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>> {
        let url = self.url(
            &[
                &entity("Dimensions", dimension),
                &entity("Hierarchies", hierarchy),
                "Elements",
            ],
            Some("$select=Name&$filter=Level eq 0"),
        )?;
        self.names(url, ObjectKind::Dimension, dimension).await
    }

    async fn subset_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>> {
        let url = self.url(
            &[
                &entity("Dimensions", dimension),
                &entity("Hierarchies", hierarchy),
                "Subsets",
            ],
            Some("$select=Name"),
        )?;
        self.names(url, ObjectKind::Dimension, dimension).await
    }

    async fn get_subset(&self, dimension: &str, hierarchy: &str, name: &str) -> Result<Subset> {
        let url = self.url(
            &[
                &entity("Dimensions", dimension),
                &entity("Hierarchies", hierarchy),
                &entity("Subsets", name),
            ],
            Some("$select=Name,Expression,Alias&$expand=Elements($select=Name)"),
        )?;
        let payload: SubsetPayload = self
            .get_json(
                url,
                ObjectKind::Dimension,
                &format!("{}:{} subset {}", dimension, hierarchy, name),
            )
            .await?;
        Ok(Subset {
            name: payload.name,
            dimension: dimension.to_string(),
            hierarchy: hierarchy.to_string(),
            expression: payload.expression,
            elements: payload.elements.into_iter().map(|e| e.name).collect(),
            alias: payload.alias.filter(|a| !a.is_empty()),
        })
    }

    async fn upsert_subset(&self, subset: &Subset) -> Result<()> {
        let dim_segment = entity("Dimensions", &subset.dimension);
        let hier_segment = entity("Hierarchies", &subset.hierarchy);
        let object = format!("{}:{}:{}", subset.dimension, subset.hierarchy, subset.name);

        let url = self.url(
            &[&dim_segment, &hier_segment, &entity("Subsets", &subset.name)],
            None,
        )?;
        self.delete_if_exists(url, &object).await?;

        let binds: Vec<String> = subset
            .elements
            .iter()
            .map(|e| element_bind(&subset.dimension, &subset.hierarchy, e))
            .collect();
        let mut body = json!({
            "Name": subset.name,
            "Elements@odata.bind": binds,
        });
        if let Some(alias) = &subset.alias {
            body["Alias"] = json!(alias);
        }

        let url = self.url(&[&dim_segment, &hier_segment, "Subsets"], None)?;
        self.send_write(self.client.post(url).json(&body), &object)
            .await?;
        Ok(())
    }

    async fn cube_exists(&self, name: &str) -> Result<bool> {
        let url = self.url(&[&entity("Cubes", name)], Some("$select=Name"))?;
        self.exists(url).await
    }

    async fn get_cube(&self, name: &str) -> Result<Cube> {
        let url = self.url(
            &[&entity("Cubes", name)],
            Some("$select=Name,Rules&$expand=Dimensions($select=Name)"),
        )?;
        let payload: CubePayload = self.get_json(url, ObjectKind::Cube, name).await?;
        Ok(Cube {
            name: payload.name,
            dimensions: payload.dimensions.into_iter().map(|d| d.name).collect(),
            rules: payload.rules.filter(|r| !r.trim().is_empty()),
        })
    }

    async fn upsert_cube(&self, cube: &Cube) -> Result<()> {
        let cube_segment = entity("Cubes", &cube.name);
        if !self.cube_exists(&cube.name).await? {
            return self.create_cube(cube).await;
        }

        let existing = self.cube_dimension_names(&cube.name).await?;
        if existing != cube.dimensions {
            warn!(
                "{}: cube {} has different dimensions, recreating",
                self.name, cube.name
            );
            let url = self.url(&[&cube_segment], None)?;
            self.delete_if_exists(url, &cube.name).await?;
            return self.create_cube(cube).await;
        }

        let url = self.url(&[&cube_segment], None)?;
        let body = json!({ "Rules": cube.rules.clone().unwrap_or_default() });
        self.send_write(self.client.patch(url).json(&body), &cube.name)
            .await?;
        Ok(())
    }

    async fn cube_dimension_names(&self, cube: &str) -> Result<Vec<String>> {
        let url = self.url(&[&entity("Cubes", cube), "Dimensions"], Some("$select=Name"))?;
        self.names(url, ObjectKind::Cube, cube).await
    }

    async fn public_view_names(&self, cube: &str) -> Result<Vec<String>> {
        let url = self.url(&[&entity("Cubes", cube), "Views"], Some("$select=Name"))?;
        self.names(url, ObjectKind::Cube, cube).await
    }

    async fn get_view(&self, cube: &str, name: &str) -> Result<View> {
        let url = self.url(&[&entity("Cubes", cube), &entity("Views", name)], None)?;
        let body: Value = self
            .get_json(url, ObjectKind::Cube, &format!("{} view {}", cube, name))
            .await?;
        Ok(View {
            name: name.to_string(),
            cube: cube.to_string(),
            body: strip_annotations(body),
        })
    }

    async fn upsert_view(&self, view: &View) -> Result<()> {
        let cube_segment = entity("Cubes", &view.cube);
        let object = format!("{}:{}", view.cube, view.name);
        let url = self.url(&[&cube_segment, &entity("Views", &view.name)], None)?;
        self.delete_if_exists(url, &object).await?;

        let mut body = view.body.clone();
        body["Name"] = json!(view.name);
        let url = self.url(&[&cube_segment, "Views"], None)?;
        self.send_write(self.client.post(url).json(&body), &object)
            .await?;
        Ok(())
    }

    async fn get_process(&self, name: &str) -> Result<Process> {
        let url = self.url(&[&entity("Processes", name)], None)?;
        let body: Value = self.get_json(url, ObjectKind::Process, name).await?;
        Ok(Process {
            name: name.to_string(),
            body: strip_annotations(body),
        })
    }

    async fn upsert_process(&self, process: &Process) -> Result<()> {
        let segment = entity("Processes", &process.name);
        let mut body = process.body.clone();
        body["Name"] = json!(process.name);

        let url = self.url(&[&segment], Some("$select=Name"))?;
        if self.exists(url).await? {
            let url = self.url(&[&segment], None)?;
            self.send_write(self.client.patch(url).json(&body), &process.name)
                .await?;
        } else {
            let url = self.url(&["Processes"], None)?;
            self.send_write(self.client.post(url).json(&body), &process.name)
                .await?;
        }
        Ok(())
    }

    async fn execute_mdx(&self, mdx: &str) -> Result<Cellset> {
        let url = self.url(
            &["ExecuteMDX"],
            Some(
                "$expand=Axes($expand=Tuples($expand=Members($select=Name))),\
                 Cells($select=Ordinal,Value)",
            ),
        )?;
        let response = self
            .client
            .post(url)
            .json(&json!({ "MDX": mdx }))
            .send()
            .await
            .map_err(|e| MigrateError::QueryExecution(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MigrateError::QueryExecution(error_message(status, &body)));
        }
        let payload: CellsetPayload = response
            .json()
            .await
            .map_err(|e| MigrateError::QueryExecution(e.to_string()))?;

        let cellset_id = payload.id.clone();
        let cells = cellset_from_payload(payload);

        if let Ok(url) = self.url(&[&entity("Cellsets", &cellset_id)], None) {
            if let Err(e) = self.client.delete(url).send().await {
                debug!("{}: failed to delete cellset {}: {}", self.name, cellset_id, e);
            }
        }
        cells
    }

    async fn write_cells(
        &self,
        cube: &str,
        dimensions: &[String],
        cells: &Cellset,
        skip_non_updateable: bool,
    ) -> Result<usize> {
        let cube_segment = entity("Cubes", cube);
        let hierarchies = self.alternate_hierarchies(dimensions, cells).await?;
        let mut written = 0;

        for chunk in cells.chunks(self.write_batch_size) {
            let body: Vec<Value> = chunk
                .iter()
                .map(|(tuple, value)| update_entry(dimensions, &hierarchies, tuple, value))
                .collect();
            match self.post_updates(&cube_segment, &json!(body), cube).await? {
                UpdateOutcome::Applied => written += chunk.len(),
                UpdateOutcome::CellsRefused(message) if skip_non_updateable => {
                    debug!(
                        "{}: batch refused ({}), writing cells one by one",
                        cube, message
                    );
                    for (entry, (tuple, _)) in body.iter().zip(chunk) {
                        match self
                            .post_updates(&cube_segment, &json!([entry]), cube)
                            .await?
                        {
                            UpdateOutcome::Applied => written += 1,
                            UpdateOutcome::CellsRefused(message) => {
                                debug!("{}: skipped cell {}: {}", cube, tuple, message);
                            }
                        }
                    }
                }
                UpdateOutcome::CellsRefused(message) => {
                    return Err(MigrateError::rejected(cube, message));
                }
            }
        }
        Ok(written)
    }
}
