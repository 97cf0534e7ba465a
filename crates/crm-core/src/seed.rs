//! Records the dashboard starts with.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::client::{Client, ClientStatus, Industry};
use crate::task::{Assignee, ProjectRef, Task, TaskPriority, TaskStatus};

const fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid seed date"),
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

struct ClientRow {
    id: &'static str,
    name: &'static str,
    company: &'static str,
    email: &'static str,
    phone: &'static str,
    status: ClientStatus,
    industry: Industry,
    last_contact: NaiveDate,
    projects: u32,
    revenue: u64,
}

const CLIENTS: [ClientRow; 6] = [
    ClientRow {
        id: "1",
        name: "John Smith",
        company: "Acme Corporation",
        email: "john.smith@acme.com",
        phone: "(555) 123-4567",
        status: ClientStatus::Active,
        industry: Industry::Technology,
        last_contact: ymd(2023, 6, 10),
        projects: 3,
        revenue: 45_000,
    },
    ClientRow {
        id: "2",
        name: "Emily Johnson",
        company: "GlobalHealth Inc.",
        email: "emily.j@globalhealth.org",
        phone: "(555) 987-6543",
        status: ClientStatus::Active,
        industry: Industry::Healthcare,
        last_contact: ymd(2023, 6, 5),
        projects: 2,
        revenue: 75_000,
    },
    ClientRow {
        id: "3",
        name: "Michael Davis",
        company: "FinTech Solutions",
        email: "mdavis@fintech.com",
        phone: "(555) 555-5555",
        status: ClientStatus::Inactive,
        industry: Industry::Finance,
        last_contact: ymd(2023, 5, 20),
        projects: 0,
        revenue: 125_000,
    },
    ClientRow {
        id: "4",
        name: "Sarah Miller",
        company: "EduLearn Academy",
        email: "sarah@edulearn.edu",
        phone: "(555) 222-3333",
        status: ClientStatus::New,
        industry: Industry::Education,
        last_contact: ymd(2023, 6, 12),
        projects: 1,
        revenue: 15_000,
    },
    ClientRow {
        id: "5",
        name: "Robert Wilson",
        company: "Retail Giants Ltd.",
        email: "robert@retailgiants.com",
        phone: "(555) 111-9999",
        status: ClientStatus::Active,
        industry: Industry::Retail,
        last_contact: ymd(2023, 6, 8),
        projects: 4,
        revenue: 95_000,
    },
    ClientRow {
        id: "6",
        name: "Lisa Brown",
        company: "Manufacturing Pro",
        email: "lbrown@manufacturingpro.com",
        phone: "(555) 444-8888",
        status: ClientStatus::Inactive,
        industry: Industry::Manufacturing,
        last_contact: ymd(2023, 4, 30),
        projects: 0,
        revenue: 55_000,
    },
];

struct TaskRow {
    id: &'static str,
    title: &'static str,
    description: &'static str,
    status: TaskStatus,
    priority: TaskPriority,
    due: NaiveDate,
    assignee: (&'static str, &'static str),
    project: (&'static str, &'static str),
    tags: [&'static str; 2],
    comments: u32,
    attachments: u32,
    created: NaiveDate,
    completed: Option<NaiveDate>,
}

const TASKS: [TaskRow; 7] = [
    TaskRow {
        id: "1",
        title: "Create wireframes for dashboard",
        description: "Design wireframes for the new admin dashboard layout",
        status: TaskStatus::Completed,
        priority: TaskPriority::High,
        due: ymd(2023, 6, 20),
        assignee: ("u1", "Alex Kim"),
        project: ("p1", "Website Redesign"),
        tags: ["design", "ui"],
        comments: 5,
        attachments: 2,
        created: ymd(2023, 6, 15),
        completed: Some(ymd(2023, 6, 18)),
    },
    TaskRow {
        id: "2",
        title: "Implement authentication API",
        description: "Build REST API endpoints for user authentication",
        status: TaskStatus::InProgress,
        priority: TaskPriority::High,
        due: ymd(2023, 6, 25),
        assignee: ("u2", "Sarah Johnson"),
        project: ("p2", "Mobile App"),
        tags: ["backend", "api"],
        comments: 3,
        attachments: 1,
        created: ymd(2023, 6, 17),
        completed: None,
    },
    TaskRow {
        id: "3",
        title: "Write documentation for API endpoints",
        description: "Create comprehensive documentation for all API endpoints",
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        due: ymd(2023, 6, 30),
        assignee: ("u3", "Michael Chen"),
        project: ("p2", "Mobile App"),
        tags: ["docs", "api"],
        comments: 1,
        attachments: 0,
        created: ymd(2023, 6, 18),
        completed: None,
    },
    TaskRow {
        id: "4",
        title: "Fix responsive layout issues",
        description: "Address responsive layout issues on mobile devices",
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        due: ymd(2023, 6, 23),
        assignee: ("u1", "Alex Kim"),
        project: ("p1", "Website Redesign"),
        tags: ["bug", "frontend"],
        comments: 2,
        attachments: 1,
        created: ymd(2023, 6, 19),
        completed: None,
    },
    TaskRow {
        id: "5",
        title: "Create marketing assets for launch",
        description: "Design and prepare marketing materials for product launch",
        status: TaskStatus::InProgress,
        priority: TaskPriority::High,
        due: ymd(2023, 6, 28),
        assignee: ("u4", "Jessica Williams"),
        project: ("p3", "Product Launch"),
        tags: ["marketing", "design"],
        comments: 7,
        attachments: 4,
        created: ymd(2023, 6, 16),
        completed: None,
    },
    TaskRow {
        id: "6",
        title: "Customer feedback analysis",
        description: "Analyze customer feedback and identify key improvement areas",
        status: TaskStatus::Todo,
        priority: TaskPriority::Low,
        due: ymd(2023, 7, 5),
        assignee: ("u5", "David Lee"),
        project: ("p3", "Product Launch"),
        tags: ["research", "analysis"],
        comments: 2,
        attachments: 1,
        created: ymd(2023, 6, 19),
        completed: None,
    },
    TaskRow {
        id: "7",
        title: "Update privacy policy",
        description: "Review and update privacy policy for compliance",
        status: TaskStatus::Canceled,
        priority: TaskPriority::Medium,
        due: ymd(2023, 6, 22),
        assignee: ("u3", "Michael Chen"),
        project: ("p1", "Website Redesign"),
        tags: ["legal", "content"],
        comments: 4,
        attachments: 2,
        created: ymd(2023, 6, 14),
        completed: None,
    },
];

pub fn clients() -> Vec<Client> {
    CLIENTS
        .iter()
        .map(|row| Client {
            id: row.id.to_string(),
            name: row.name.to_string(),
            company: row.company.to_string(),
            email: row.email.to_string(),
            phone: row.phone.to_string(),
            status: row.status,
            industry: row.industry,
            last_contact: row.last_contact,
            projects: row.projects,
            revenue: row.revenue,
            avatar: None,
        })
        .collect()
}

pub fn tasks() -> Vec<Task> {
    TASKS
        .iter()
        .map(|row| Task {
            id: row.id.to_string(),
            title: row.title.to_string(),
            description: Some(row.description.to_string()),
            status: row.status,
            priority: row.priority,
            due_date: row.due,
            assignee: Some(Assignee {
                id: row.assignee.0.to_string(),
                name: row.assignee.1.to_string(),
                avatar: None,
            }),
            project: Some(ProjectRef {
                id: row.project.0.to_string(),
                name: row.project.1.to_string(),
            }),
            tags: row.tags.iter().map(|t| t.to_string()).collect::<BTreeSet<_>>(),
            comments: row.comments,
            attachments: row.attachments,
            created_at: midnight(row.created),
            completed_at: row.completed.map(midnight),
        })
        .collect()
}
